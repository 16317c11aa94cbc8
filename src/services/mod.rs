//! Business logic services

pub mod auth;
pub mod catalog;
pub mod metadata;
pub mod rentals;

use std::sync::Arc;

use crate::{config::AppConfig, repository::Repository};

use self::metadata::MetadataSource;

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub auth: auth::AuthService,
    pub catalog: catalog::CatalogService,
    pub rentals: rentals::RentalsService,
    pub repository: Repository,
}

impl Services {
    /// Create all services over one repository and one metadata source
    pub fn new(repository: Repository, config: &AppConfig, metadata: Arc<dyn MetadataSource>) -> Self {
        Self {
            auth: auth::AuthService::new(repository.clone(), config.auth.clone()),
            catalog: catalog::CatalogService::new(repository.clone(), metadata.clone(), config.metadata.clone()),
            rentals: rentals::RentalsService::new(repository.clone(), metadata, config.rentals.clone()),
            repository,
        }
    }
}
