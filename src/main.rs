use std::sync::Arc;

use actix_cors::Cors;
use actix_web::{App, HttpServer, web};
use anyhow::Context;
use tracing::info;

use trackgate::cache::{AdmissionCache, RedisAdmissionCache};
use trackgate::config;
use trackgate::rpc::{Dispatcher, TokenAdminService, TrackPipeline, handle_rpc};
use trackgate::security::ServiceKeys;
use trackgate::services::TrackingService;
use trackgate::services::geoip::GeoIpProvider;
use trackgate::storage::{self, SeaOrmStore};
use trackgate::system::logging::init_logging;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let app_config =
        Arc::new(config::load().context("Failed to load configuration")?);

    // 日志 guard 需要存活到进程结束
    let _log_guard = init_logging(&app_config.logging);

    // 密钥缺失时先生成再接流量
    ServiceKeys::ensure_key_pair(
        &app_config.security.private_key_path,
        &app_config.security.public_key_path,
    )
    .context("Failed to ensure RSA key pair")?;
    let keys = Arc::new(
        ServiceKeys::load(
            &app_config.security.private_key_path,
            &app_config.security.public_key_path,
            &app_config.security.kid,
        )
        .context("Failed to load RSA key pair")?,
    );
    info!("RSA keys loaded, kid={}", app_config.security.kid);

    let db = storage::connect(&app_config.database)
        .await
        .context("Failed to connect to database")?;
    storage::run_migrations(&db)
        .await
        .context("Failed to run migrations")?;
    let store = Arc::new(SeaOrmStore::new(db));
    info!("Database connected and migrated");

    let cache: Arc<dyn AdmissionCache> = Arc::new(
        RedisAdmissionCache::connect(&app_config.redis)
            .await
            .context("Failed to connect to redis")?,
    );
    info!("Redis connected");

    let geo = Arc::new(GeoIpProvider::new(&app_config.geoip));

    let pipeline = Arc::new(TrackPipeline::new(
        &app_config,
        cache,
        keys.clone(),
        store.clone(),
        store.clone(),
        store.clone(),
        store.clone(),
        store.clone(),
        geo,
    ));
    let admin = Arc::new(TokenAdminService::new(store.clone()));
    let dispatcher = Arc::new(Dispatcher::new(pipeline.clone(), admin));

    let bind_address = format!("{}:{}", app_config.service.host, app_config.service.port);
    info!("Starting server at http://{}", bind_address);

    let server_config = app_config.clone();
    HttpServer::new(move || {
        // 浏览器从任意站点提交遥测，RPC/SDK 端点需要放开跨域
        let cors = Cors::default()
            .allow_any_origin()
            .allowed_methods(vec!["GET", "POST"])
            .allow_any_header()
            .max_age(3600);

        App::new()
            .app_data(web::Data::new(server_config.clone()))
            .app_data(web::Data::new(pipeline.clone()))
            .app_data(web::Data::new(dispatcher.clone()))
            .app_data(web::Data::new(keys.clone()))
            .wrap(cors)
            .route("/rpc", web::post().to(handle_rpc))
            .route("/r/{code}", web::get().to(TrackingService::handle_redirect))
            .route(
                "/t/{code}",
                web::get().to(TrackingService::handle_script_page),
            )
            .route("/sdk/track.js", web::get().to(TrackingService::handle_sdk))
            .route(
                "/api/public-keys",
                web::get().to(TrackingService::handle_public_keys),
            )
    })
    .bind(&bind_address)
    .with_context(|| format!("Failed to bind {bind_address}"))?
    .run()
    .await?;

    Ok(())
}
