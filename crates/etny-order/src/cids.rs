use etny_domain::Metadata;

/// The content-addressed ids an order needs fetched before execution
/// (spec.md §4.6 "Fetch": "derive `enclave_image_cid`, `compose_cid`,
/// `challenge_cid`, `payload_cid`, `input_cid` (optional)").
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderContent {
    pub enclave_image_cid: String,
    pub compose_cid: String,
    pub challenge_cid: String,
    pub payload_cid: String,
    pub input_cid: Option<String>,
}

impl OrderContent {
    pub fn from_metadata(metadata: &Metadata) -> Self {
        Self {
            enclave_image_cid: metadata.spec.image_cid.clone(),
            compose_cid: metadata.spec.compose_cid.clone(),
            challenge_cid: metadata.spec.challenge_cid.clone(),
            payload_cid: metadata.payload_hash.cid.clone(),
            input_cid: metadata.input_hash.as_ref().map(|h| h.cid.clone()),
        }
    }

    /// Every CID this order needs downloaded before execution can start.
    pub fn all_cids(&self) -> Vec<String> {
        let mut cids = vec![
            self.enclave_image_cid.clone(),
            self.compose_cid.clone(),
            self.challenge_cid.clone(),
            self.payload_cid.clone(),
        ];
        if let Some(input) = &self.input_cid {
            cids.push(input.clone());
        }
        cids
    }
}
