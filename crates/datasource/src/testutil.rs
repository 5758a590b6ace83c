//! Test helpers: fake capture children
//!
//! A fake child is a shell script that cats a pre-encoded frame file to
//! stdout and then either execs `cat` (to stay alive and swallow commands)
//! or exits. Scripts live in a tempdir that doubles as the binary
//! allow-list, so the whole launch path is exercised for real.

#![cfg(unix)]

use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use aircap_protocol::{encode_frame, encode_success, Bytes};
use serde::Serialize;
use tempfile::TempDir;

/// A tempdir of fake capture child scripts, usable as `bin_paths`
pub struct FakeChildren {
    dir: TempDir,
}

impl FakeChildren {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().unwrap(),
        }
    }

    /// Allow-list containing the script dir plus the system utilities
    pub fn bin_paths(&self) -> Vec<PathBuf> {
        vec![
            self.dir.path().to_path_buf(),
            PathBuf::from("/bin"),
            PathBuf::from("/usr/bin"),
        ]
    }

    /// Install a script that prints `frames` and then keeps echoing stdin
    pub fn responder(&self, name: &str, frames: &[Bytes]) {
        self.install(name, frames, true);
    }

    /// Install a script that prints `frames` and exits
    pub fn one_shot(&self, name: &str, frames: &[Bytes]) {
        self.install(name, frames, false);
    }

    fn install(&self, name: &str, frames: &[Bytes], stay_alive: bool) {
        use std::os::unix::fs::PermissionsExt;

        let data_path = self.dir.path().join(format!("{name}.bin"));
        let mut data = Vec::new();
        for frame in frames {
            data.extend_from_slice(frame);
        }
        fs::write(&data_path, data).unwrap();

        let tail = if stay_alive { "exec cat\n" } else { "" };
        let script = format!("#!/bin/sh\ncat \"{}\"\n{tail}", data_path.display());

        let script_path = self.dir.path().join(name);
        fs::write(&script_path, script).unwrap();
        let mut perms = fs::metadata(&script_path).unwrap().permissions();
        perms.set_mode(0o755);
        fs::set_permissions(&script_path, perms).unwrap();
    }
}

/// A bare `status` frame marking the child ready
pub fn status_frame() -> Bytes {
    encode_frame("status", &[]).unwrap()
}

/// A `proberesp` frame carrying only a verdict
pub fn proberesp_frame(success: bool) -> Bytes {
    encode_frame("proberesp", &[("success", &encode_success(success)[..])]).unwrap()
}

/// An `openresp` frame with a verdict and channel list
pub fn openresp_frame(success: bool, channels: &[&str]) -> Bytes {
    #[derive(Serialize)]
    struct RawChannels {
        channels: Vec<String>,
    }
    let payload = rmp_serde::to_vec_named(&RawChannels {
        channels: channels.iter().map(|c| c.to_string()).collect(),
    })
    .unwrap();

    encode_frame(
        "openresp",
        &[
            ("success", &encode_success(success)[..]),
            ("channels", payload.as_slice()),
        ],
    )
    .unwrap()
}

/// A `data` frame carrying one captured packet
pub fn data_frame(payload: &[u8]) -> Bytes {
    #[derive(Serialize)]
    struct RawPacket {
        tv_sec: u64,
        tv_usec: u64,
        dlt: u64,
        size: u64,
        #[serde(with = "serde_bytes")]
        packet: Vec<u8>,
    }

    let object = rmp_serde::to_vec_named(&RawPacket {
        tv_sec: 1_700_000_000,
        tv_usec: 1234,
        dlt: 127,
        size: payload.len() as u64,
        packet: payload.to_vec(),
    })
    .unwrap();

    encode_frame("data", &[("packet", object.as_slice())]).unwrap()
}

/// Poll `condition` until it holds or the timeout elapses
pub async fn wait_for<F: Fn() -> bool>(condition: F, what: &str) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while !condition() {
        if tokio::time::Instant::now() > deadline {
            panic!("timed out waiting for {what}");
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}
