use serde::{Deserialize, Serialize};
use std::fmt;

use crate::models::{Library, ServerType};

/// Key locating the playlist that stands in for favorites.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FavoritesScope {
    /// No library selected.
    Root,
    /// Named after the selected library.
    Library(String),
}

impl FavoritesScope {
    pub fn for_library(library: Option<&Library>) -> Self {
        match library {
            Some(library) => FavoritesScope::Library(library.name.clone()),
            None => FavoritesScope::Root,
        }
    }
}

impl fmt::Display for FavoritesScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FavoritesScope::Root => write!(f, "<root>"),
            FavoritesScope::Library(name) => write!(f, "{}", name),
        }
    }
}

/// Naming table for favorites playlists: `playlist_prefix + scope name`,
/// with the root scope name chosen per backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FavoritesNaming {
    #[serde(default = "default_prefix")]
    pub playlist_prefix: String,

    #[serde(default = "default_root_scope")]
    pub emby_root_scope: String,

    #[serde(default = "default_root_scope")]
    pub plex_root_scope: String,
}

impl Default for FavoritesNaming {
    fn default() -> Self {
        Self {
            playlist_prefix: default_prefix(),
            emby_root_scope: default_root_scope(),
            plex_root_scope: default_root_scope(),
        }
    }
}

impl FavoritesNaming {
    pub fn root_scope_name(&self, server_type: ServerType) -> &str {
        match server_type {
            ServerType::Emby => &self.emby_root_scope,
            ServerType::Plex => &self.plex_root_scope,
        }
    }

    pub fn playlist_name(&self, scope: &FavoritesScope, server_type: ServerType) -> String {
        let scope_name = match scope {
            FavoritesScope::Root => self.root_scope_name(server_type),
            FavoritesScope::Library(name) => name.as_str(),
        };
        format!("{}{}", self.playlist_prefix, scope_name)
    }
}

fn default_prefix() -> String {
    "Tok-".to_string()
}

// Playlists created by earlier clients use this name for the root scope.
fn default_root_scope() -> String {
    "收藏".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_library_scope_playlist_name() {
        let naming = FavoritesNaming::default();
        let movies = Library::new("1", "Movies");
        let scope = FavoritesScope::for_library(Some(&movies));

        assert_eq!(scope, FavoritesScope::Library("Movies".to_string()));
        assert_eq!(naming.playlist_name(&scope, ServerType::Emby), "Tok-Movies");
        assert_eq!(naming.playlist_name(&scope, ServerType::Plex), "Tok-Movies");
    }

    #[test]
    fn test_root_scope_is_per_backend() {
        let naming = FavoritesNaming {
            playlist_prefix: "Fav-".to_string(),
            emby_root_scope: "All".to_string(),
            plex_root_scope: "Everything".to_string(),
        };
        let scope = FavoritesScope::for_library(None);

        assert_eq!(naming.playlist_name(&scope, ServerType::Emby), "Fav-All");
        assert_eq!(naming.playlist_name(&scope, ServerType::Plex), "Fav-Everything");
    }

    #[test]
    fn test_default_root_name() {
        let naming = FavoritesNaming::default();
        assert_eq!(
            naming.playlist_name(&FavoritesScope::Root, ServerType::Emby),
            "Tok-收藏"
        );
    }
}
