//! A stand-in sensor for demos and tests: listens on a local TCP port and
//! streams quaternion payloads the way a wearable node's firmware would.

use log::debug;
use rand::prelude::*;
use std::io::{self, Write};
use std::net::{Shutdown, SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// A fake wearable node spinning slowly around its Z axis, with a little
/// noise so consecutive payloads differ.
pub struct DummySensor {
    addr: SocketAddr,
    running: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl DummySensor {
    /// Binds an OS-assigned local port and starts accepting clients, each
    /// of which receives one payload line per `period`.
    pub fn spawn(period: Duration) -> io::Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0")?;
        let addr = listener.local_addr()?;
        // Nonblocking so the broadcast loop can poll for new clients
        // between payloads.
        listener.set_nonblocking(true)?;

        let running = Arc::new(AtomicBool::new(true));
        let th_running = Arc::clone(&running);
        let handle = thread::spawn(move || {
            let mut clients: Vec<TcpStream> = Vec::new();
            let mut rng = thread_rng();
            let mut angle: f32 = 0.0;
            while th_running.load(Ordering::SeqCst) {
                while let Ok((client, peer)) = listener.accept() {
                    debug!("dummy sensor on {} accepted {}", addr, peer);
                    clients.push(client);
                }

                angle += 0.01 + rng.gen_range(0.0..0.005);
                let (w, z) = ((angle / 2.0).cos(), (angle / 2.0).sin());
                let line = format!("{},0,0,{}\n", w, z);
                clients.retain_mut(|client| client.write_all(line.as_bytes()).is_ok());

                thread::sleep(period);
            }
            for client in &clients {
                let _ = client.shutdown(Shutdown::Both);
            }
        });

        Ok(DummySensor {
            addr,
            running,
            handle: Some(handle),
        })
    }

    /// The local address the sensor listens on.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// The address as a `host:port` string, ready for the connect command.
    pub fn endpoint(&self) -> String {
        self.addr.to_string()
    }

    /// Stops broadcasting and closes every client connection.
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for DummySensor {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::ConnectionStatus;
    use crate::event::RelayEvent;
    use crate::registry::ConnectionRegistry;
    use std::sync::Mutex;
    use std::time::Instant;

    fn wait_for(what: &str, mut pred: impl FnMut() -> bool) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while !pred() {
            assert!(Instant::now() < deadline, "timed out waiting for {}", what);
            thread::sleep(Duration::from_millis(10));
        }
    }

    /// End-to-end over real sockets: connect, stream samples, remote close.
    #[test]
    fn registry_streams_from_a_dummy_sensor() {
        let mut sensor = DummySensor::spawn(Duration::from_millis(10)).unwrap();
        let registry = ConnectionRegistry::new();
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&events);
        let _ = registry.subscribe(move |e| sink.lock().unwrap().push(e.clone()));

        registry.connect("Head", &sensor.endpoint()).unwrap();
        wait_for("handshake", || {
            registry.view("Head").map_or(false, |v| {
                v.status == ConnectionStatus::Connected
            })
        });

        // Samples start flowing and move away from the identity.
        wait_for("first sample", || {
            registry
                .view("Head")
                .map_or(false, |v| v.sample.z != 0.0)
        });

        // Sensor shutdown looks like a remote close, not a fault.
        sensor.stop();
        wait_for("remote close", || {
            registry.view("Head").map_or(false, |v| {
                v.status == ConnectionStatus::Disconnected
            })
        });

        let events = events.lock().unwrap();
        assert!(events
            .iter()
            .any(|e| matches!(e, RelayEvent::Connected { .. })));
        assert!(events
            .iter()
            .any(|e| matches!(e, RelayEvent::Disconnected { .. })));
    }
}
