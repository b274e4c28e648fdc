//! Companion app catalog.
//!
//! Every device session exposes exactly the apps in the catalog, no more and
//! no fewer. The catalog is injected by configuration so sessions carry no
//! knowledge of which apps ship.

use companion_types::{AppId, CompanionApp};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;
use uuid::Uuid;

/// App id of the shipped watch face.
pub const WATCH_FACE_APP_ID: AppId =
    AppId::from_uuid(Uuid::from_u128(0x072d1d77_05ce_43b6_b889_c32169598401));

/// App id of the shipped data field.
pub const DATA_FIELD_APP_ID: AppId =
    AppId::from_uuid(Uuid::from_u128(0x14cbe159_40d2_413c_8374_87a9dbc9739a));

/// Catalog validation errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CatalogError {
    /// The catalog has no apps.
    #[error("companion app catalog is empty")]
    Empty,

    /// The same app id appears twice.
    #[error("duplicate companion app id: {0}")]
    DuplicateApp(AppId),
}

/// Validated, ordered list of companion apps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<CompanionApp>", into = "Vec<CompanionApp>")]
pub struct CompanionCatalog {
    apps: Vec<CompanionApp>,
}

impl CompanionCatalog {
    /// Build a catalog, rejecting empty lists and duplicate app ids.
    pub fn new(apps: Vec<CompanionApp>) -> Result<Self, CatalogError> {
        if apps.is_empty() {
            return Err(CatalogError::Empty);
        }
        let mut seen = HashSet::with_capacity(apps.len());
        for app in &apps {
            if !seen.insert(app.app_id) {
                return Err(CatalogError::DuplicateApp(app.app_id));
            }
        }
        Ok(Self { apps })
    }

    /// The apps, in catalog order.
    pub fn apps(&self) -> &[CompanionApp] {
        &self.apps
    }

    /// Look up an app by id.
    pub fn get(&self, app_id: &AppId) -> Option<&CompanionApp> {
        self.apps.iter().find(|app| &app.app_id == app_id)
    }

    /// Number of apps.
    pub fn len(&self) -> usize {
        self.apps.len()
    }

    /// Always false for a validated catalog.
    pub fn is_empty(&self) -> bool {
        self.apps.is_empty()
    }
}

impl Default for CompanionCatalog {
    fn default() -> Self {
        Self {
            apps: vec![
                CompanionApp::new(WATCH_FACE_APP_ID, "xDrip Watchface"),
                CompanionApp::new(DATA_FIELD_APP_ID, "xDrip Data Field"),
            ],
        }
    }
}

impl TryFrom<Vec<CompanionApp>> for CompanionCatalog {
    type Error = CatalogError;

    fn try_from(apps: Vec<CompanionApp>) -> Result<Self, Self::Error> {
        Self::new(apps)
    }
}

impl From<CompanionCatalog> for Vec<CompanionApp> {
    fn from(catalog: CompanionCatalog) -> Self {
        catalog.apps
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_catalog_has_two_shipped_apps() {
        let catalog = CompanionCatalog::default();
        assert_eq!(catalog.len(), 2);
        assert_eq!(
            catalog.apps()[0].app_id.to_string(),
            "072d1d77-05ce-43b6-b889-c32169598401"
        );
        assert_eq!(
            catalog.apps()[1].app_id.to_string(),
            "14cbe159-40d2-413c-8374-87a9dbc9739a"
        );
    }

    #[test]
    fn empty_catalog_rejected() {
        assert_eq!(CompanionCatalog::new(vec![]), Err(CatalogError::Empty));
    }

    #[test]
    fn duplicate_app_rejected() {
        let apps = vec![
            CompanionApp::new(WATCH_FACE_APP_ID, "one"),
            CompanionApp::new(WATCH_FACE_APP_ID, "two"),
        ];
        assert_eq!(
            CompanionCatalog::new(apps),
            Err(CatalogError::DuplicateApp(WATCH_FACE_APP_ID))
        );
    }

    #[test]
    fn lookup_by_id() {
        let catalog = CompanionCatalog::default();
        let app = catalog.get(&DATA_FIELD_APP_ID).unwrap();
        assert_eq!(app.display_name, "xDrip Data Field");
        assert!(catalog
            .get(&AppId::from_uuid(Uuid::from_u128(1)))
            .is_none());
    }
}
