//! Minimal SOCKS4/4a and SOCKS5 client handshakes.
//!
//! Only the CONNECT command without authentication is supported, which is
//! all that is needed to tunnel a WHOIS query through a public proxy.

use crate::error::DomainScanError;
use crate::types::{ProxyEndpoint, ProxyKind};
use std::net::{IpAddr, Ipv4Addr};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

const SOCKS4_VERSION: u8 = 0x04;
const SOCKS5_VERSION: u8 = 0x05;
const CMD_CONNECT: u8 = 0x01;
const SOCKS4_GRANTED: u8 = 90;
const SOCKS5_NO_AUTH: u8 = 0x00;
const ATYP_IPV4: u8 = 0x01;
const ATYP_DOMAIN: u8 = 0x03;
const ATYP_IPV6: u8 = 0x04;

/// Open a tunnel to `target_host:target_port` through a SOCKS proxy.
///
/// The whole exchange (TCP connect plus handshake) must finish within
/// `timeout`. Every failure is reported as a [`DomainScanError::ProxyError`]
/// naming the proxy, so callers can retire it.
pub async fn connect(
    kind: ProxyKind,
    proxy: &ProxyEndpoint,
    target_host: &str,
    target_port: u16,
    timeout: Duration,
) -> Result<TcpStream, DomainScanError> {
    let attempt = async {
        let mut stream = TcpStream::connect((proxy.host.as_str(), proxy.port))
            .await
            .map_err(|e| DomainScanError::proxy(proxy.to_string(), e.to_string()))?;

        match kind {
            ProxyKind::Socks4 => socks4_handshake(&mut stream, target_host, target_port).await,
            ProxyKind::Socks5 => socks5_handshake(&mut stream, target_host, target_port).await,
        }
        .map_err(|message| DomainScanError::proxy(proxy.to_string(), message))?;

        Ok(stream)
    };

    tokio::time::timeout(timeout, attempt)
        .await
        .map_err(|_| DomainScanError::proxy(proxy.to_string(), "connection timed out"))?
}

/// SOCKS4 for IPv4 targets, SOCKS4a for host names.
async fn socks4_handshake(stream: &mut TcpStream, host: &str, port: u16) -> Result<(), String> {
    let mut request = vec![SOCKS4_VERSION, CMD_CONNECT];
    request.extend_from_slice(&port.to_be_bytes());

    match host.parse::<Ipv4Addr>() {
        Ok(ip) => {
            request.extend_from_slice(&ip.octets());
            request.push(0x00); // empty user id
        }
        Err(_) => {
            // 0.0.0.x with x != 0 asks the proxy to resolve the name
            request.extend_from_slice(&[0, 0, 0, 1]);
            request.push(0x00);
            request.extend_from_slice(host.as_bytes());
            request.push(0x00);
        }
    }

    stream
        .write_all(&request)
        .await
        .map_err(|e| format!("socks4 request: {}", e))?;

    let mut response = [0u8; 8];
    stream
        .read_exact(&mut response)
        .await
        .map_err(|e| format!("socks4 response: {}", e))?;

    if response[1] != SOCKS4_GRANTED {
        return Err(format!("socks4 request rejected (CD={})", response[1]));
    }
    Ok(())
}

async fn socks5_handshake(stream: &mut TcpStream, host: &str, port: u16) -> Result<(), String> {
    stream
        .write_all(&[SOCKS5_VERSION, 1, SOCKS5_NO_AUTH])
        .await
        .map_err(|e| format!("socks5 greeting: {}", e))?;

    let mut choice = [0u8; 2];
    stream
        .read_exact(&mut choice)
        .await
        .map_err(|e| format!("socks5 greeting: {}", e))?;
    if choice[0] != SOCKS5_VERSION {
        return Err(format!("not a socks5 server (version {})", choice[0]));
    }
    if choice[1] != SOCKS5_NO_AUTH {
        return Err(format!("socks5 requires method {}", choice[1]));
    }

    let mut request = vec![SOCKS5_VERSION, CMD_CONNECT, 0x00];
    match host.parse::<IpAddr>() {
        Ok(IpAddr::V4(ip)) => {
            request.push(ATYP_IPV4);
            request.extend_from_slice(&ip.octets());
        }
        Ok(IpAddr::V6(ip)) => {
            request.push(ATYP_IPV6);
            request.extend_from_slice(&ip.octets());
        }
        Err(_) => {
            let name = host.as_bytes();
            let len = u8::try_from(name.len())
                .map_err(|_| format!("host name too long for socks5: {}", host))?;
            request.push(ATYP_DOMAIN);
            request.push(len);
            request.extend_from_slice(name);
        }
    }
    request.extend_from_slice(&port.to_be_bytes());

    stream
        .write_all(&request)
        .await
        .map_err(|e| format!("socks5 connect: {}", e))?;

    let mut header = [0u8; 4];
    stream
        .read_exact(&mut header)
        .await
        .map_err(|e| format!("socks5 reply: {}", e))?;
    if header[0] != SOCKS5_VERSION {
        return Err(format!("bad socks5 reply version {}", header[0]));
    }
    if header[1] != 0x00 {
        return Err(format!("socks5 connect failed (REP={})", header[1]));
    }

    // Skip BND.ADDR and BND.PORT
    let remaining = match header[3] {
        ATYP_IPV4 => 4 + 2,
        ATYP_IPV6 => 16 + 2,
        ATYP_DOMAIN => {
            let mut len = [0u8; 1];
            stream
                .read_exact(&mut len)
                .await
                .map_err(|e| format!("socks5 reply: {}", e))?;
            usize::from(len[0]) + 2
        }
        other => return Err(format!("unknown socks5 address type {}", other)),
    };
    let mut bound = vec![0u8; remaining];
    stream
        .read_exact(&mut bound)
        .await
        .map_err(|e| format!("socks5 reply: {}", e))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    async fn read_cstring(stream: &mut TcpStream) -> Vec<u8> {
        let mut out = Vec::new();
        loop {
            let byte = stream.read_u8().await.unwrap();
            if byte == 0 {
                return out;
            }
            out.push(byte);
        }
    }

    async fn bind_proxy() -> (TcpListener, ProxyEndpoint) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        (listener, ProxyEndpoint::new("127.0.0.1", port))
    }

    #[tokio::test]
    async fn test_socks5_tunnel_by_host_name() {
        let (listener, endpoint) = bind_proxy().await;

        let server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut greeting = [0u8; 3];
            socket.read_exact(&mut greeting).await.unwrap();
            assert_eq!(greeting, [5, 1, 0]);
            socket.write_all(&[5, 0]).await.unwrap();

            let mut head = [0u8; 5];
            socket.read_exact(&mut head).await.unwrap();
            assert_eq!(&head[..4], &[5, 1, 0, ATYP_DOMAIN]);
            let mut name = vec![0u8; head[4] as usize];
            socket.read_exact(&mut name).await.unwrap();
            assert_eq!(name, b"whois.nic.ir");
            assert_eq!(socket.read_u16().await.unwrap(), 43);

            socket
                .write_all(&[5, 0, 0, ATYP_IPV4, 0, 0, 0, 0, 0, 0])
                .await
                .unwrap();

            let mut query = [0u8; 7];
            socket.read_exact(&mut query).await.unwrap();
            assert_eq!(&query, b"ab.ir\r\n");
            socket.write_all(b"No entries found").await.unwrap();
        });

        let mut stream = connect(
            ProxyKind::Socks5,
            &endpoint,
            "whois.nic.ir",
            43,
            Duration::from_secs(2),
        )
        .await
        .unwrap();

        stream.write_all(b"ab.ir\r\n").await.unwrap();
        let mut reply = String::new();
        stream.read_to_string(&mut reply).await.unwrap();
        assert_eq!(reply, "No entries found");
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_socks4a_sends_host_name() {
        let (listener, endpoint) = bind_proxy().await;

        let server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut head = [0u8; 8];
            socket.read_exact(&mut head).await.unwrap();
            assert_eq!(head, [4, 1, 0, 43, 0, 0, 0, 1]);
            assert!(read_cstring(&mut socket).await.is_empty());
            assert_eq!(read_cstring(&mut socket).await, b"whois.nic.ir");
            socket
                .write_all(&[0, SOCKS4_GRANTED, 0, 0, 0, 0, 0, 0])
                .await
                .unwrap();
        });

        connect(
            ProxyKind::Socks4,
            &endpoint,
            "whois.nic.ir",
            43,
            Duration::from_secs(2),
        )
        .await
        .unwrap();
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_socks4_rejection_is_a_proxy_error() {
        let (listener, endpoint) = bind_proxy().await;

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut head = [0u8; 9];
            socket.read_exact(&mut head).await.unwrap();
            socket.write_all(&[0, 91, 0, 0, 0, 0, 0, 0]).await.unwrap();
        });

        let err = connect(
            ProxyKind::Socks4,
            &endpoint,
            "10.1.2.3",
            43,
            Duration::from_secs(2),
        )
        .await
        .unwrap_err();

        match err {
            DomainScanError::ProxyError { proxy, message } => {
                assert_eq!(proxy, endpoint.to_string());
                assert!(message.contains("91"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_silent_proxy_times_out() {
        let (listener, endpoint) = bind_proxy().await;

        let server = tokio::spawn(async move {
            let (socket, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_millis(500)).await;
            drop(socket);
        });

        let err = connect(
            ProxyKind::Socks5,
            &endpoint,
            "whois.nic.ir",
            43,
            Duration::from_millis(100),
        )
        .await
        .unwrap_err();

        assert!(err.to_string().contains("timed out"));
        server.abort();
    }
}
