//! IP 地址处理工具
//!
//! 提供统一的客户端 IP 提取功能，支持：
//! - 可信代理配置（trusted_proxies）
//! - CIDR 匹配
//! - 私有 IP 自动检测

use std::net::{IpAddr, SocketAddr};

use actix_web::HttpRequest;

/// 检查 IP 是否为私有地址或 localhost
pub fn is_private_or_local(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => v4.is_private() || v4.is_loopback(),
        IpAddr::V6(v6) => {
            // IPv6 私有地址：
            // - fc00::/7 (ULA, RFC 4193): fc00::/8 + fd00::/8
            // - fe80::/10 (Link-local)
            // - ::1 (Loopback)
            v6.is_loopback()
                || (v6.segments()[0] & 0xfe00) == 0xfc00 // fc00::/7 (包含 fc00 和 fd00)
                || (v6.segments()[0] & 0xffc0) == 0xfe80 // fe80::/10 (link-local)
        }
    }
}

/// 检查 IP 是否在可信代理列表中
pub fn is_trusted_proxy(ip: &str, trusted_proxies: &[String]) -> bool {
    // 先尝试解析为 SocketAddr（支持 ip:port），如果失败再尝试纯 IpAddr
    let ip_addr = if let Ok(socket_addr) = ip.parse::<SocketAddr>() {
        socket_addr.ip()
    } else if let Ok(ip_addr) = ip.parse::<IpAddr>() {
        ip_addr
    } else {
        return false;
    };

    for proxy in trusted_proxies {
        if proxy.contains('/') {
            // CIDR 格式（如 "192.168.1.0/24"）
            if ip_in_cidr(&ip_addr, proxy) {
                return true;
            }
        } else {
            // 单 IP
            if let Ok(proxy_addr) = proxy.parse::<IpAddr>()
                && ip_addr == proxy_addr
            {
                return true;
            }
        }
    }
    false
}

/// CIDR 检查
pub fn ip_in_cidr(ip: &IpAddr, cidr: &str) -> bool {
    let Some((network, prefix_len)) = cidr.split_once('/') else {
        return false;
    };

    let Ok(prefix_len): Result<u8, _> = prefix_len.parse() else {
        return false;
    };

    let Ok(network_addr) = network.parse::<IpAddr>() else {
        return false;
    };

    match (ip, network_addr) {
        (IpAddr::V4(ip), IpAddr::V4(net)) => {
            if prefix_len > 32 {
                return false;
            }
            let mask = u32::MAX.checked_shl(32 - prefix_len as u32).unwrap_or(0);
            let ip_bits = u32::from_be_bytes(ip.octets());
            let net_bits = u32::from_be_bytes(net.octets());
            (ip_bits & mask) == (net_bits & mask)
        }
        (IpAddr::V6(ip), IpAddr::V6(net)) => {
            if prefix_len > 128 {
                return false;
            }
            let mask = u128::MAX.checked_shl(128 - prefix_len as u32).unwrap_or(0);
            let ip_bits = u128::from_be_bytes(ip.octets());
            let net_bits = u128::from_be_bytes(net.octets());
            (ip_bits & mask) == (net_bits & mask)
        }
        _ => false, // IPv4 vs IPv6 不匹配
    }
}

/// 提取真实客户端 IP
///
/// 策略（按优先级）：
/// 1. 显式配置 trusted_proxies 且连接方匹配 → 使用转发头
/// 2. 未配置 trusted_proxies 且连接来自私有 IP → 自动检测代理，使用转发头
/// 3. 默认 → 使用连接 IP（公网直连场景，防止伪造）
pub fn extract_client_ip(req: &HttpRequest, trusted_proxies: &[String]) -> String {
    let forwarded = forwarded_ip(req);

    if let Some(peer) = req.peer_addr() {
        let peer_ip = peer.ip();
        let use_forwarded = if trusted_proxies.is_empty() {
            is_private_or_local(&peer_ip)
        } else {
            is_trusted_proxy(&peer_ip.to_string(), trusted_proxies)
        };
        if use_forwarded && let Some(ip) = forwarded {
            return ip;
        }
        return peer_ip.to_string();
    }

    // 无 peer 地址（测试环境等），退回转发头或连接信息
    forwarded.unwrap_or_else(|| {
        req.connection_info()
            .realip_remote_addr()
            .unwrap_or("")
            .to_string()
    })
}

/// X-Forwarded-For 第一跳，或 X-Real-IP
fn forwarded_ip(req: &HttpRequest) -> Option<String> {
    if let Some(xff) = req.headers().get("X-Forwarded-For")
        && let Ok(value) = xff.to_str()
    {
        let first = value.split(',').next().unwrap_or("").trim();
        if !first.is_empty() {
            return Some(first.to_string());
        }
    }
    if let Some(real_ip) = req.headers().get("X-Real-IP")
        && let Ok(value) = real_ip.to_str()
    {
        let trimmed = value.trim();
        if !trimmed.is_empty() {
            return Some(trimmed.to_string());
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn private_and_loopback_detection() {
        assert!(is_private_or_local(&"127.0.0.1".parse().unwrap()));
        assert!(is_private_or_local(&"10.0.0.5".parse().unwrap()));
        assert!(is_private_or_local(&"192.168.1.20".parse().unwrap()));
        assert!(is_private_or_local(&"::1".parse().unwrap()));
        assert!(is_private_or_local(&"fd00::1".parse().unwrap()));
        assert!(!is_private_or_local(&"8.8.8.8".parse().unwrap()));
    }

    #[test]
    fn cidr_matching() {
        let ip: IpAddr = "192.168.1.42".parse().unwrap();
        assert!(ip_in_cidr(&ip, "192.168.1.0/24"));
        assert!(!ip_in_cidr(&ip, "192.168.2.0/24"));
        assert!(ip_in_cidr(&ip, "192.168.0.0/16"));
        assert!(!ip_in_cidr(&ip, "not-a-cidr"));
    }

    #[test]
    fn trusted_proxy_list() {
        let proxies = vec!["10.0.0.1".to_string(), "172.16.0.0/12".to_string()];
        assert!(is_trusted_proxy("10.0.0.1", &proxies));
        assert!(is_trusted_proxy("10.0.0.1:443", &proxies));
        assert!(is_trusted_proxy("172.20.3.4", &proxies));
        assert!(!is_trusted_proxy("8.8.8.8", &proxies));
        assert!(!is_trusted_proxy("garbage", &proxies));
    }
}
