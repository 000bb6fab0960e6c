//! Local fallback content: deterministic mapping from object identity to
//! pre-bundled media, used when the content gateway is exhausted.

use crate::config::CatalogEntry;
use crate::session::ContentKind;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Immutable lookup table from object key to bundled assets.
///
/// Built once from the object catalog; no network, no mutable state.
/// Unmapped keys resolve to `None`, never an error.
pub struct FallbackLibrary {
    intros: BTreeMap<String, PathBuf>,
    responses: BTreeMap<String, PathBuf>,
}

impl FallbackLibrary {
    /// Build the table from the configured catalog.
    pub fn from_catalog(catalog: &BTreeMap<String, CatalogEntry>) -> Self {
        let mut intros = BTreeMap::new();
        let mut responses = BTreeMap::new();
        for (key, entry) in catalog {
            if let Some(path) = &entry.intro_asset {
                intros.insert(key.clone(), path.clone());
            }
            if let Some(path) = &entry.response_asset {
                responses.insert(key.clone(), path.clone());
            }
        }
        Self { intros, responses }
    }

    /// Resolve bundled media for an object key, or `None` if unmapped.
    pub fn resolve(&self, object_key: &str, kind: ContentKind) -> Option<&Path> {
        let table = match kind {
            ContentKind::Intro => &self.intros,
            ContentKind::Response => &self.responses,
        };
        table.get(object_key).map(PathBuf::as_path)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

    use super::*;

    fn library() -> FallbackLibrary {
        let mut catalog = BTreeMap::new();
        catalog.insert(
            "p1".to_owned(),
            CatalogEntry {
                content_id: "poster-p1".into(),
                display_name: "Widget".into(),
                intro_asset: Some(PathBuf::from("assets/p1_intro.mp4")),
                response_asset: Some(PathBuf::from("assets/p1_generic.mp4")),
            },
        );
        catalog.insert(
            "p2".to_owned(),
            CatalogEntry {
                content_id: "poster-p2".into(),
                display_name: "Gadget".into(),
                intro_asset: None,
                response_asset: None,
            },
        );
        FallbackLibrary::from_catalog(&catalog)
    }

    #[test]
    fn resolves_mapped_assets() {
        let lib = library();
        assert_eq!(
            lib.resolve("p1", ContentKind::Intro),
            Some(Path::new("assets/p1_intro.mp4"))
        );
        assert_eq!(
            lib.resolve("p1", ContentKind::Response),
            Some(Path::new("assets/p1_generic.mp4"))
        );
    }

    #[test]
    fn unmapped_assets_resolve_to_none() {
        let lib = library();
        assert_eq!(lib.resolve("p2", ContentKind::Intro), None);
        assert_eq!(lib.resolve("p2", ContentKind::Response), None);
    }

    #[test]
    fn unknown_key_resolves_to_none() {
        let lib = library();
        assert_eq!(lib.resolve("ghost", ContentKind::Intro), None);
    }

    #[test]
    fn lookups_are_stable() {
        let lib = library();
        for _ in 0..3 {
            assert!(lib.resolve("p1", ContentKind::Intro).is_some());
        }
    }
}
