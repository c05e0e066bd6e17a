pub struct Utils;

impl Utils {
    /// Parse an address:port string into a bare IP and a port.
    ///
    /// Handles the formats printed by `ss` and `lsof`:
    /// - IPv4: "127.0.0.1:3000" or "*:8080"
    /// - IPv6: "\[::1]:3000" or "\[fe80::1]:8080" (brackets are stripped)
    /// - Scoped: "127.0.0.53%lo:53" (the interface suffix is dropped)
    ///
    /// A `*` port (unconnected peer) parses as port 0.
    pub fn parse_address(address: &str) -> Option<(String, u16)> {
        let (addr, port_str) = if address.starts_with('[') {
            // IPv6 format: [::1]:3000
            let bracket_end = address.find(']')?;
            if bracket_end + 1 >= address.len() || address.as_bytes()[bracket_end + 1] != b':' {
                return None;
            }
            (&address[1..bracket_end], &address[bracket_end + 2..])
        } else {
            // IPv4 format: 127.0.0.1:3000 or *:8080
            let last_colon = address.rfind(':')?;
            (&address[..last_colon], &address[last_colon + 1..])
        };

        let port: u16 = if port_str == "*" {
            0
        } else {
            port_str.parse().ok()?
        };

        let addr = addr.split('%').next().unwrap_or(addr);
        let addr = if addr.is_empty() { "*" } else { addr };
        Some((addr.to_string(), port))
    }

    /// Parse a peer address, mapping wildcards and garbage to "no peer".
    pub fn parse_peer(address: &str) -> (String, u16) {
        match Self::parse_address(address) {
            Some((addr, port)) if port != 0 => (addr, port),
            _ => (String::new(), 0),
        }
    }
}
