/// Builds the on-chain result string (spec.md §4.6 "Report", §6
/// "Result-string format"): `v3:<transaction_hex>:<result_cid>`.
/// `transaction_hex` and `result_cid` come verbatim from the enclave's
/// `transaction.txt`/`result.txt` pair.
pub fn build_report(transaction_hex: &str, result_cid: &str) -> String {
    format!("v3:{transaction_hex}:{result_cid}")
}

/// A result submitted in place of a real enclave attestation, when the
/// lifecycle gives up on an order rather than let it hang forever
/// (spec.md §7 "Propagation policy"). Each variant's text is the literal
/// wording spec.md's scenarios and error taxonomy use, since some chain
/// indexers match on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyntheticResult {
    /// spec.md §8 S4 / §4.6 "Retry ledger".
    TooManyRetries,
    /// spec.md §7 "Content fetch".
    CannotDownloadFiles,
    /// spec.md §7 "Execution timeout".
    ExecutionTimedOut,
}

impl SyntheticResult {
    pub fn as_str(self) -> &'static str {
        match self {
            SyntheticResult::TooManyRetries => "[Warn] Order execution failed more than 10 times",
            SyntheticResult::CannotDownloadFiles => "Error: cannot download files from IPFS",
            SyntheticResult::ExecutionTimedOut => "[WARN]:Task execution timed out",
        }
    }
}

impl std::fmt::Display for SyntheticResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
