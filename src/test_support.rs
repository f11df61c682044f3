use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, OnceLock};

use rusqlite::Connection;

use crate::adapters::db::{LATEST_SCHEMA_VERSION, open_connection, run_migrations};

static TEST_DB_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Opens a private copy of a migrated template database.
///
/// Set `TEST_DB_TEMPLATE_PATH` to reuse a template produced by `create_test_db`.
pub fn open_test_connection(test_name: &str) -> Connection {
    let test_db_path = unique_test_db_path(test_name);
    std::fs::create_dir_all(test_db_dir()).expect("test db dir should be creatable");
    std::fs::copy(template_db(), &test_db_path).expect("template db should be copied");

    open_connection(test_db_path.to_string_lossy().as_ref()).expect("test db should open")
}

pub fn shared_test_connection(test_name: &str) -> Arc<Mutex<Connection>> {
    Arc::new(Mutex::new(open_test_connection(test_name)))
}

fn template_db() -> &'static PathBuf {
    static TEMPLATE_PATH: OnceLock<PathBuf> = OnceLock::new();

    TEMPLATE_PATH.get_or_init(|| {
        let template_path = std::env::var("TEST_DB_TEMPLATE_PATH")
            .ok()
            .filter(|value| !value.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| {
                test_db_dir().join(format!("template-v{LATEST_SCHEMA_VERSION}.sqlite"))
            });

        if let Some(parent) = template_path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).expect("template parent dir should be creatable");
        }

        let mut connection =
            open_connection(template_path.to_string_lossy().as_ref()).expect("template db opens");
        run_migrations(&mut connection).expect("template migrations should succeed");

        template_path
    })
}

fn test_db_dir() -> PathBuf {
    PathBuf::from("./target/testdb")
}

fn unique_test_db_path(test_name: &str) -> PathBuf {
    let counter = TEST_DB_COUNTER.fetch_add(1, Ordering::Relaxed);
    test_db_dir().join(format!(
        "{test_name}-{}-{counter}.sqlite",
        std::process::id()
    ))
}
