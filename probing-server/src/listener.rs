use std::net::SocketAddr;

use tokio::net::{TcpListener, UnixListener};

/// Where the socket server accepts connections: a UNIX domain
/// socket — preferably in the abstract namespace, which requires no
/// filesystem cleanup and cannot collide with a stale file from a crashed
/// prior run — or a plain TCP `host:port`.
pub enum Listener {
    Unix(UnixListener),
    Tcp(TcpListener),
}

impl std::fmt::Debug for Listener {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Listener::Unix(_) => write!(f, "Listener::Unix"),
            Listener::Tcp(_) => write!(f, "Listener::Tcp"),
        }
    }
}

impl Listener {
    pub async fn bind_tcp(addr: SocketAddr) -> std::io::Result<Self> {
        Ok(Listener::Tcp(TcpListener::bind(addr).await?))
    }

    /// Binds an abstract-namespace UNIX socket named `\0probing-<id>` on
    /// Linux. On other platforms the abstract namespace does not exist, so
    /// this falls back to a filesystem-path socket under the system temp
    /// directory, removing any stale socket file left by a crashed prior
    /// run first.
    #[cfg(target_os = "linux")]
    pub fn bind_unix_abstract(id: &str) -> std::io::Result<Self> {
        use std::os::linux::net::SocketAddrExt;
        use std::os::unix::net::{SocketAddr as StdSocketAddr, UnixListener as StdUnixListener};

        let name = format!("probing-{id}");
        let addr = StdSocketAddr::from_abstract_name(name.as_bytes())?;
        let std_listener = StdUnixListener::bind_addr(&addr)?;
        std_listener.set_nonblocking(true)?;
        Ok(Listener::Unix(UnixListener::from_std(std_listener)?))
    }

    #[cfg(not(target_os = "linux"))]
    pub fn bind_unix_abstract(id: &str) -> std::io::Result<Self> {
        let path = std::env::temp_dir().join(format!("probing-{id}.sock"));
        let _ = std::fs::remove_file(&path);
        Ok(Listener::Unix(UnixListener::bind(path)?))
    }
}
