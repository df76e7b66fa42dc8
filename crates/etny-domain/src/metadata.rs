use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// A `kind:cid` content hash, e.g. `sha256:QmAbc...` (spec.md §3
/// "Metadata" row: "payload_hash and input_hash prefixed `kind:cid`").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentHash {
    pub kind: String,
    pub cid: String,
}

impl ContentHash {
    pub fn parse(raw: &str) -> Result<Self, DomainError> {
        let (kind, cid) = raw.split_once(':').ok_or_else(|| DomainError::MalformedContentHash(raw.to_string()))?;
        if kind.is_empty() || cid.is_empty() {
            return Err(DomainError::MalformedContentHash(raw.to_string()));
        }
        Ok(Self { kind: kind.to_string(), cid: cid.to_string() })
    }
}

/// Parsed `v3:<image-cid>:<image-name>:<compose-cid>:<challenge-cid>:<pubkey>`
/// spec string (spec.md §3 "Metadata" row).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpecV3 {
    pub image_cid: String,
    pub image_name: String,
    pub compose_cid: String,
    pub challenge_cid: String,
    pub pubkey: String,
}

impl SpecV3 {
    pub fn parse(raw: &str) -> Result<Self, DomainError> {
        let parts: Vec<&str> = raw.split(':').collect();
        let [tag, image_cid, image_name, compose_cid, challenge_cid, pubkey] = parts.as_slice() else {
            return Err(DomainError::MalformedSpec(
                raw.to_string(),
                "expected v3:<image-cid>:<image-name>:<compose-cid>:<challenge-cid>:<pubkey>",
            ));
        };
        if *tag != "v3" {
            return Err(DomainError::MalformedSpec(raw.to_string(), "unsupported spec version, expected v3"));
        }
        Ok(Self {
            image_cid: image_cid.to_string(),
            image_name: image_name.to_string(),
            compose_cid: compose_cid.to_string(),
            challenge_cid: challenge_cid.to_string(),
            pubkey: pubkey.to_string(),
        })
    }
}

/// The DO request's 5-tuple metadata (spec.md §3 "Metadata" row):
/// `[version_string, spec_string, payload_hash, input_hash, pinned_operator]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    pub version: String,
    pub spec: SpecV3,
    pub payload_hash: ContentHash,
    pub input_hash: Option<ContentHash>,
    /// Non-empty iff this DO is pinned to a specific operator address
    /// (spec.md §4.5 "Pinned DOs").
    pub pinned_operator: Option<String>,
}

impl Metadata {
    pub fn parse(tuple: [String; 5]) -> Result<Self, DomainError> {
        let [version, spec, payload_hash, input_hash, pinned_operator] = tuple;
        Ok(Self {
            version,
            spec: SpecV3::parse(&spec)?,
            payload_hash: ContentHash::parse(&payload_hash)?,
            input_hash: if input_hash.is_empty() { None } else { Some(ContentHash::parse(&input_hash)?) },
            pinned_operator: if pinned_operator.is_empty() { None } else { Some(pinned_operator) },
        })
    }

    /// Whether `operator` is free to act on this DO per the pinning rule:
    /// unpinned DOs are open to anyone; pinned DOs only to their pin.
    pub fn is_eligible_for(&self, operator: &str) -> bool {
        match &self.pinned_operator {
            None => true,
            Some(pinned) => pinned.eq_ignore_ascii_case(operator),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_well_formed_spec_v3() {
        let spec = SpecV3::parse("v3:Qmimage:my-task:Qmcompose:Qmchallenge:0xpub").unwrap();
        assert_eq!(spec.image_cid, "Qmimage");
        assert_eq!(spec.image_name, "my-task");
        assert_eq!(spec.compose_cid, "Qmcompose");
        assert_eq!(spec.challenge_cid, "Qmchallenge");
        assert_eq!(spec.pubkey, "0xpub");
    }

    #[test]
    fn rejects_non_v3_or_malformed_spec() {
        assert!(SpecV3::parse("v2:a:b:c:d:e").is_err());
        assert!(SpecV3::parse("v3:a:b:c").is_err());
    }

    #[test]
    fn content_hash_requires_kind_prefix() {
        assert_eq!(
            ContentHash::parse("sha256:QmAbc").unwrap(),
            ContentHash { kind: "sha256".into(), cid: "QmAbc".into() }
        );
        assert!(ContentHash::parse("QmAbc").is_err());
    }

    #[test]
    fn empty_pinned_operator_slot_means_unpinned() {
        let m = Metadata::parse([
            "1".into(),
            "v3:a:b:c:d:e".into(),
            "sha256:payload".into(),
            "".into(),
            "".into(),
        ])
        .unwrap();
        assert!(m.pinned_operator.is_none());
        assert!(m.input_hash.is_none());
        assert!(m.is_eligible_for("0xanyone"));
    }

    #[test]
    fn pinned_operator_restricts_eligibility() {
        let m = Metadata::parse([
            "1".into(),
            "v3:a:b:c:d:e".into(),
            "sha256:payload".into(),
            "sha256:input".into(),
            "0xPinned".into(),
        ])
        .unwrap();
        assert!(m.is_eligible_for("0xpinned"));
        assert!(!m.is_eligible_for("0xsomeoneelse"));
    }
}
