use std::path::Path;
use std::sync::Arc;

use tracing::{error, info, warn};
use uuid::Uuid;

use catalog_import_server::domain::repository::{ImportJobRepository, ProductRepository};
use catalog_import_server::infrastructure::config::Config;
use catalog_import_server::infrastructure::database;
use catalog_import_server::infrastructure::dispatcher::{self, ImportWorker};
use catalog_import_server::infrastructure::logging::init_logging;
use catalog_import_server::infrastructure::persistence::{
    ImportJobPostgresRepository, InMemoryImportJobRepository, InMemoryProductRepository,
    ProductPostgresRepository,
};
use catalog_import_server::usecase::{
    GetImportJobUseCase, RunImportUseCase, SubmitImportUseCase, UpsertProductBatchUseCase,
};
use catalog_import_server::MIGRATOR;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Config
    let config_path =
        std::env::var("CONFIG_PATH").unwrap_or_else(|_| "config/config.yaml".to_string());
    let cfg = Config::load(&config_path)?;

    // Logging
    init_logging(&cfg.logging)?;

    info!(
        app_name = %cfg.app.name,
        version = %cfg.app.version,
        environment = %cfg.app.environment,
        batch_size = cfg.import.batch_size,
        "starting catalog-import server"
    );

    // Database pool (optional)
    let db_pool = if let Some(ref db_config) = cfg.database {
        let options = match std::env::var("DATABASE_URL") {
            Ok(url) => database::options_from_url(&url)?,
            Err(_) => db_config.connect_options()?,
        };
        info!("connecting to database");
        let pool = database::connect(options, db_config.max_open_conns).await?;
        info!("database connection pool established");
        Some(pool)
    } else if let Ok(url) = std::env::var("DATABASE_URL") {
        let options = database::options_from_url(&url)?;
        let pool = database::connect(options, database::DEFAULT_MAX_CONNECTIONS).await?;
        info!("database connection pool established from DATABASE_URL");
        Some(pool)
    } else {
        info!("no database configured, using in-memory repositories");
        None
    };

    if let Some(ref pool) = db_pool {
        if auto_migrate_enabled() {
            MIGRATOR.run(pool).await?;
            info!("database migrations applied");
        }
    }

    // Repositories
    let (job_repo, product_repo): (Arc<dyn ImportJobRepository>, Arc<dyn ProductRepository>) =
        if let Some(ref pool) = db_pool {
            (
                Arc::new(ImportJobPostgresRepository::new(pool.clone())),
                Arc::new(ProductPostgresRepository::new(pool.clone())),
            )
        } else {
            (
                Arc::new(InMemoryImportJobRepository::new()),
                Arc::new(InMemoryProductRepository::new()),
            )
        };

    // Use cases
    let upsert_uc = Arc::new(UpsertProductBatchUseCase::new(product_repo));
    let run_uc = Arc::new(
        RunImportUseCase::new(job_repo.clone(), upsert_uc).with_batch_size(cfg.import.batch_size),
    );
    let get_uc = GetImportJobUseCase::new(job_repo.clone());

    // Worker
    let (import_dispatcher, rx) = dispatcher::channel(cfg.import.queue_capacity);
    let worker = ImportWorker::new(rx, run_uc).start();

    let submit_uc = SubmitImportUseCase::new(
        job_repo,
        Arc::new(import_dispatcher),
        cfg.import.upload_dir.clone(),
    );

    let mut job_ids: Vec<Uuid> = Vec::new();
    for path in std::env::args().skip(1) {
        let filename = Path::new(&path)
            .file_name()
            .map_or_else(|| path.clone(), |n| n.to_string_lossy().into_owned());
        let file = match std::fs::File::open(&path) {
            Ok(file) => file,
            Err(e) => {
                error!(path = %path, error = %e, "failed to open input file, skipping");
                continue;
            }
        };
        match submit_uc.execute(&filename, file).await {
            Ok(job) => {
                info!(job_id = %job.id, path = %path, "import submitted");
                job_ids.push(job.id);
            }
            Err(e) => error!(path = %path, error = %e, "failed to submit import"),
        }
    }

    // 送信側を破棄してキューを閉じる
    drop(submit_uc);

    tokio::select! {
        joined = worker => match joined {
            Ok(handled) => info!(handled = handled, "all import jobs finished"),
            Err(e) => error!(error = %e, "import worker stopped unexpectedly"),
        },
        () = shutdown_signal() => {
            warn!("shutdown requested before all import jobs finished");
        }
    }

    for job_id in job_ids {
        match get_uc.execute(job_id).await {
            Ok(job) => {
                info!(
                    job_id = %job.id,
                    filename = %job.filename,
                    status = %job.status,
                    total_rows = ?job.total_rows,
                    processed_rows = job.processed_rows,
                    error_message = ?job.error_message,
                    "import job final state"
                );
                println!("{}", serde_json::to_string(&job)?);
            }
            Err(e) => error!(job_id = %job_id, error = %e, "failed to read import job"),
        }
    }

    info!("catalog-import server stopped");
    Ok(())
}

fn auto_migrate_enabled() -> bool {
    std::env::var("AUTO_MIGRATE")
        .map(|raw| {
            let v = raw.trim().to_ascii_lowercase();
            matches!(v.as_str(), "1" | "true" | "on" | "yes")
        })
        .unwrap_or(false)
}

async fn shutdown_signal() {
    use tokio::signal;

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = signal::ctrl_c() => {},
        () = terminate => {},
    }
    info!("shutdown signal received");
}
