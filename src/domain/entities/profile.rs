use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::error;

/// De facto standard schema of user profiles carried in kind-0 events.
///
/// Every known field is optional; anything the author put in the content
/// beyond the known keys is kept verbatim in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    /// Screen name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Display name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    /// Bio.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub about: Option<String>,
    /// URL of the user's icon.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub picture: Option<String>,
    /// URL of the banner image.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub banner: Option<String>,
    /// NIP-05 identifier.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nip05: Option<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl Profile {
    /// Parses kind-0 event content into a profile.
    ///
    /// Clients disagree on key names, so each known field is pulled from a
    /// list of candidate keys in priority order. Content that is not a JSON
    /// object parses to `None`; that is a per-record recovery, not an error.
    pub fn from_metadata_content(content: &str) -> Option<Self> {
        let value: Value = match serde_json::from_str(content) {
            Ok(value) => value,
            Err(err) => {
                error!("failed to parse kind 0 content as profile: {err}");
                return None;
            }
        };
        let Value::Object(mut map) = value else {
            error!("kind 0 content is not a JSON object");
            return None;
        };

        let name = pull_out_string(&mut map, &["name", "username"]);
        let display_name = pull_out_string(&mut map, &["display_name", "displayName"]);
        let about = pull_out_string(&mut map, &["about"]);
        let picture = pull_out_string(&mut map, &["picture"]);
        let banner = pull_out_string(&mut map, &["banner"]);
        let nip05 = pull_out_string(&mut map, &["nip05", "nip-05", "nip5"]);

        Some(Self {
            name,
            display_name,
            about,
            picture,
            banner,
            nip05,
            extra: map.into_iter().collect(),
        })
    }
}

fn pull_out_string(
    map: &mut serde_json::Map<String, Value>,
    key_candidates: &[&str],
) -> Option<String> {
    let mut found = None;
    for key in key_candidates {
        match map.remove(*key) {
            Some(Value::String(s)) if found.is_none() => found = Some(s),
            _ => {}
        }
    }
    found
}

/// A parsed profile together with the metadata of the event that carried it.
///
/// `created_at` is the freshness marker for the monotonic cache merge: for a
/// given pubkey only the newest record ever observed is retained.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileRecord {
    pub profile: Profile,
    /// `pubkey` of the original event.
    pub pubkey: String,
    /// `created_at` of the original event, unix seconds.
    pub created_at: i64,
}

impl ProfileRecord {
    pub fn new(profile: Profile, pubkey: impl Into<String>, created_at: i64) -> Self {
        Self {
            profile,
            pubkey: pubkey.into(),
            created_at,
        }
    }

    /// Best available human-readable name, falling back to the pubkey.
    pub fn display_label(&self) -> &str {
        self.profile
            .display_name
            .as_deref()
            .or(self.profile.name.as_deref())
            .unwrap_or(&self.pubkey)
    }
}
