use std::io;
use std::net::TcpListener;

/// What binding a port says about its occupancy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindCheck {
    /// Both binds succeeded.
    Free,
    /// A bind failed with `AddrInUse`.
    InUse,
    /// A bind failed for another reason (EACCES on a privileged port, no
    /// IPv4 stack). Says nothing about who holds the port.
    Inconclusive,
}

impl BindCheck {
    /// Combine the loopback and wildcard bind results.
    pub fn from_results(port: u16, loopback: io::Result<()>, wildcard: io::Result<()>) -> Self {
        let mut check = BindCheck::Free;
        for result in [loopback, wildcard] {
            match result {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::AddrInUse => return BindCheck::InUse,
                Err(e) => {
                    tracing::debug!("Bind check on port {} inconclusive: {}", port, e);
                    check = BindCheck::Inconclusive;
                }
            }
        }
        check
    }
}

/// Try to bind a port on both loopback and the wildcard address.
///
/// On macOS binding `127.0.0.1` can succeed while `0.0.0.0` is in use, so
/// both are tried. This catches listeners owned by processes the inspector
/// cannot see (other users, restricted `/proc`).
pub fn check_bind(port: u16) -> BindCheck {
    // Each listener is dropped before the next bind so they don't collide.
    let loopback = TcpListener::bind(("127.0.0.1", port)).map(drop);
    let wildcard = TcpListener::bind(("0.0.0.0", port)).map(drop);
    BindCheck::from_results(port, loopback, wildcard)
}
