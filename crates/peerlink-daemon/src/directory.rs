//! Most recent discovered-peer set.

use peerlink_types::Peer;

/// Discovered peers in platform order. Replaced wholesale on every update.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PeerDirectory {
    peers: Vec<Peer>,
}

impl PeerDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the contents with `peers`, dropping every previous entry.
    pub fn replace(&mut self, peers: Vec<Peer>) {
        self.peers = peers;
    }

    pub fn clear(&mut self) {
        self.peers.clear();
    }

    pub fn peers(&self) -> &[Peer] {
        &self.peers
    }

    /// Display names in platform order.
    pub fn names(&self) -> Vec<String> {
        self.peers.iter().map(|p| p.name.clone()).collect()
    }

    /// First peer with this display name. Names are not unique.
    pub fn find_by_name(&self, name: &str) -> Option<&Peer> {
        self.peers.iter().find(|p| p.name == name)
    }

    pub fn find_by_address(&self, address: &str) -> Option<&Peer> {
        self.peers.iter().find(|p| p.address.as_str() == address)
    }

    /// Look up by display name, falling back to device address so callers
    /// can tell apart peers that share a name.
    pub fn resolve(&self, key: &str) -> Option<&Peer> {
        self.find_by_name(key).or_else(|| self.find_by_address(key))
    }

    pub fn len(&self) -> usize {
        self.peers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn peer(addr: &str, name: &str) -> Peer {
        Peer::new(addr, name)
    }

    #[test]
    fn replace_drops_stale_entries() {
        let mut dir = PeerDirectory::new();
        dir.replace(vec![peer("a", "Alpha"), peer("b", "Beta")]);
        dir.replace(vec![peer("c", "Gamma")]);
        assert_eq!(dir.peers(), &[peer("c", "Gamma")]);
        assert!(dir.find_by_name("Alpha").is_none());
    }

    #[test]
    fn names_keep_platform_order() {
        let mut dir = PeerDirectory::new();
        dir.replace(vec![peer("z", "Zed"), peer("a", "Ann"), peer("m", "Mo")]);
        assert_eq!(dir.names(), ["Zed", "Ann", "Mo"]);
    }

    #[test]
    fn duplicate_names_resolve_to_first_then_by_address() {
        let mut dir = PeerDirectory::new();
        dir.replace(vec![peer("a1", "Pixel-7"), peer("a2", "Pixel-7")]);
        assert_eq!(dir.resolve("Pixel-7").unwrap().address.as_str(), "a1");
        assert_eq!(dir.resolve("a2").unwrap().address.as_str(), "a2");
        assert!(dir.resolve("missing").is_none());
    }

    #[test]
    fn empty_update_empties_directory() {
        let mut dir = PeerDirectory::new();
        dir.replace(vec![peer("a", "Alpha")]);
        dir.replace(Vec::new());
        assert!(dir.is_empty());
        assert_eq!(dir.len(), 0);
    }
}
