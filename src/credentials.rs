use common::{bounded, NetworkName, Passphrase, ReportAddress};
use std::fmt;

/// The network the node is trying to be on, plus where the controller wants
/// status reported. Every field is a fixed-size buffer; longer input is
/// truncated, never rejected.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct CredentialStore {
    network_name: NetworkName,
    passphrase: Passphrase,
    report_address: ReportAddress,
}

impl CredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace all three fields at once
    pub fn set(&mut self, network_name: &str, passphrase: &str, report_address: &str) {
        *self = Self {
            network_name: bounded(network_name),
            passphrase: bounded(passphrase),
            report_address: bounded(report_address),
        };
    }

    /// A connection attempt needs both a name and a passphrase
    pub fn is_complete(&self) -> bool {
        !self.network_name.is_empty() && !self.passphrase.is_empty()
    }

    /// True when the given pair matches the stored one, compared after
    /// truncation to the field bounds.
    pub fn equals(&self, network_name: &str, passphrase: &str) -> bool {
        self.network_name == bounded::<{ common::NETWORK_NAME_LEN }>(network_name)
            && self.passphrase == bounded::<{ common::PASSPHRASE_LEN }>(passphrase)
    }

    /// A pair worth reconnecting for: both fields present, and both
    /// different from what is stored. Changing only one of them does not
    /// qualify.
    pub fn is_fresh_pair(&self, network_name: &str, passphrase: &str) -> bool {
        let network_name = bounded::<{ common::NETWORK_NAME_LEN }>(network_name);
        let passphrase = bounded::<{ common::PASSPHRASE_LEN }>(passphrase);

        !network_name.is_empty()
            && !passphrase.is_empty()
            && network_name != self.network_name
            && passphrase != self.passphrase
    }

    pub fn network_name(&self) -> &str {
        &self.network_name
    }

    pub fn passphrase(&self) -> &str {
        &self.passphrase
    }

    pub fn report_address(&self) -> &str {
        &self.report_address
    }
}

impl fmt::Debug for CredentialStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialStore")
            .field("network_name", &self.network_name.as_str())
            .field("passphrase", &Masked(&self.passphrase))
            .field("report_address", &self.report_address.as_str())
            .finish()
    }
}

/// Displays a secret as one `*` per character
pub struct Masked<'a>(pub &'a str);

impl fmt::Display for Masked<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for _ in self.0.chars() {
            f.write_str("*")?;
        }
        Ok(())
    }
}

impl fmt::Debug for Masked<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{}\"", self)
    }
}
