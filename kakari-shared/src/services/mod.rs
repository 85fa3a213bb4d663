/// Business services ("directories")
///
/// Each directory owns one slice of the domain and talks to persistence only
/// through [`Storage`](crate::storage::Storage).
///
/// - [`users::UserDirectory`]: accounts, roles, passwords, password reset
/// - [`tasks::TaskDirectory`]: tasks, task queries, comments
/// - [`projects::ProjectDirectory`]: projects, membership, task linkage
/// - [`mail`]: outbound email transports
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use kakari_shared::services::Directories;
/// use kakari_shared::services::mail::LogMailer;
/// use kakari_shared::services::users::UserDirectorySettings;
/// use kakari_shared::storage::memory::MemoryStorage;
///
/// let directories = Directories::new(
///     Arc::new(MemoryStorage::new()),
///     Arc::new(LogMailer),
///     UserDirectorySettings::new("http://localhost:8080"),
/// );
/// # let _ = directories;
/// ```

pub mod mail;
pub mod projects;
pub mod tasks;
pub mod users;

use std::sync::Arc;

use crate::storage::Storage;
use mail::Mailer;
use projects::ProjectDirectory;
use tasks::TaskDirectory;
use users::{UserDirectory, UserDirectorySettings};

/// All directories over one shared store
#[derive(Clone)]
pub struct Directories {
    pub users: UserDirectory,
    pub tasks: TaskDirectory,
    pub projects: ProjectDirectory,
    pub storage: Arc<dyn Storage>,
}

impl Directories {
    pub fn new(
        storage: Arc<dyn Storage>,
        mailer: Arc<dyn Mailer>,
        user_settings: UserDirectorySettings,
    ) -> Self {
        Self {
            users: UserDirectory::new(storage.clone(), mailer, user_settings),
            tasks: TaskDirectory::new(storage.clone()),
            projects: ProjectDirectory::new(storage.clone()),
            storage,
        }
    }
}
