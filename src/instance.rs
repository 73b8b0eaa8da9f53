use std::fs;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::thread;

use anyhow::{anyhow, Result};
use interprocess::local_socket::{
    traits::{ListenerExt, Stream as _},
    GenericFilePath, Listener, ListenerOptions, Stream, ToFsName,
};
use log::{debug, info, warn};

use crate::config::project_dirs;

const SOCKET_NAME: &str = "wayfinder.sock";
const TOGGLE_COMMAND: &str = "toggle";

pub fn socket_path() -> PathBuf {
    project_dirs()
        .map(|dirs| {
            let dir = dirs.runtime_dir().unwrap_or_else(|| dirs.cache_dir()).to_path_buf();
            let _ = fs::create_dir_all(&dir);
            dir.join(SOCKET_NAME)
        })
        .unwrap_or_else(|| std::env::temp_dir().join(SOCKET_NAME))
}

/// Asks a running instance to toggle its panel. Returns false when nothing
/// is listening, including when a stale socket file was left behind.
pub fn signal_running() -> bool {
    signal_at(&socket_path())
}

fn signal_at(path: &Path) -> bool {
    let Ok(name) = path.to_fs_name::<GenericFilePath>() else {
        return false;
    };
    let mut stream = match Stream::connect(name) {
        Ok(stream) => stream,
        Err(err) => {
            debug!("No instance listening at {:?}: {}", path, err);
            return false;
        }
    };
    match stream.write_all(format!("{TOGGLE_COMMAND}\n").as_bytes()) {
        Ok(()) => true,
        Err(err) => {
            warn!("Failed to reach running instance: {}", err);
            false
        }
    }
}

/// Listening socket owned by the running instance. The socket file is
/// removed on drop.
pub struct InstanceSocket {
    path: PathBuf,
    listener: Option<Listener>,
}

impl InstanceSocket {
    pub fn bind() -> Result<Self> {
        Self::bind_at(socket_path())
    }

    fn bind_at(path: PathBuf) -> Result<Self> {
        // Only reached when nobody answered on the path, so any file there is stale.
        let _ = fs::remove_file(&path);
        let name = path.as_path().to_fs_name::<GenericFilePath>()?;
        let listener = ListenerOptions::new().name(name).create_sync()?;
        info!("Listening for toggle requests at {:?}", path);
        Ok(Self {
            path,
            listener: Some(listener),
        })
    }

    /// Serves toggle requests on a background thread, calling `on_toggle`
    /// once per request.
    pub fn listen<F>(&mut self, mut on_toggle: F) -> Result<()>
    where
        F: FnMut() + Send + 'static,
    {
        let listener = self
            .listener
            .take()
            .ok_or_else(|| anyhow!("instance socket is already listening"))?;

        thread::spawn(move || {
            for conn in listener.incoming().filter_map(|c| c.ok()) {
                for line in BufReader::new(conn).lines().map_while(|line| line.ok()) {
                    if line.trim() == TOGGLE_COMMAND {
                        on_toggle();
                    } else {
                        debug!("Ignoring instance command {:?}", line);
                    }
                }
            }
        });
        Ok(())
    }
}

impl Drop for InstanceSocket {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.path);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;
    use std::time::Duration;

    fn test_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("wayfinder-{}-{}.sock", std::process::id(), name))
    }

    #[test]
    fn stale_socket_file_is_not_an_instance() {
        let path = test_path("stale");
        fs::write(&path, b"4242").unwrap();

        assert!(!signal_at(&path));

        let _ = fs::remove_file(&path);
    }

    #[test]
    fn unrelated_live_process_is_left_alone() {
        let path = test_path("bystander");
        let mut bystander = std::process::Command::new("sleep").arg("30").spawn().unwrap();
        fs::write(&path, bystander.id().to_string()).unwrap();

        assert!(!signal_at(&path));
        assert!(bystander.try_wait().unwrap().is_none());

        bystander.kill().unwrap();
        let _ = bystander.wait();
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn missing_socket_is_not_an_instance() {
        assert!(!signal_at(&test_path("missing")));
    }

    #[test]
    fn toggle_request_reaches_listener() {
        let path = test_path("live");
        let mut socket = InstanceSocket::bind_at(path.clone()).unwrap();
        let (tx, rx) = mpsc::channel();
        socket.listen(move || {
            let _ = tx.send(());
        })
        .unwrap();

        assert!(signal_at(&path));
        assert!(rx.recv_timeout(Duration::from_secs(5)).is_ok());

        assert!(signal_at(&path));
        assert!(rx.recv_timeout(Duration::from_secs(5)).is_ok());
    }

    #[test]
    fn binding_replaces_stale_file_and_drop_removes_it() {
        let path = test_path("cleanup");
        fs::write(&path, b"leftover").unwrap();

        let socket = InstanceSocket::bind_at(path.clone()).unwrap();
        assert!(path.exists());
        drop(socket);

        assert!(!path.exists());
    }

    #[test]
    fn listening_twice_is_an_error() {
        let mut socket = InstanceSocket::bind_at(test_path("twice")).unwrap();
        socket.listen(|| {}).unwrap();
        assert!(socket.listen(|| {}).is_err());
    }
}
