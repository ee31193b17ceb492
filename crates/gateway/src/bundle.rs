//! Per-node agent bundle: a zip assembled in memory on every download.
//!
//! Contents: `config.json` (node identity + endpoints), a curl-based
//! agent script, an installer, and a README. Nothing is persisted — the
//! archive is rebuilt fresh each request, and downloading it rotates the
//! node credential so the config always carries a working cleartext key.

use std::io::{Cursor, Write};

use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

use dn_domain::{Error, Node, Result};

/// Everything baked into `config.json`.
pub struct BundleConfig<'a> {
    pub node: &'a Node,
    /// Cleartext node key minted for this bundle.
    pub node_api_key: &'a str,
    pub backend_url: &'a str,
    pub classifier_url: &'a str,
}

/// Build the zip archive for one node.
pub fn build_agent_bundle(cfg: &BundleConfig<'_>) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    {
        let mut zip = ZipWriter::new(Cursor::new(&mut buf));
        let doc = FileOptions::default().compression_method(CompressionMethod::Deflated);
        let script = doc.unix_permissions(0o755);

        let config_json = serde_json::to_string_pretty(&serde_json::json!({
            "node_id": cfg.node.node_id,
            "node_api_key": cfg.node_api_key,
            "backend_url": cfg.backend_url,
            "classifier_url": cfg.classifier_url,
            "version": env!("CARGO_PKG_VERSION"),
        }))?;

        zip.start_file("config.json", doc).map_err(zip_err)?;
        zip.write_all(config_json.as_bytes())?;

        zip.start_file("agent.sh", script).map_err(zip_err)?;
        zip.write_all(agent_script().as_bytes())?;

        zip.start_file("install.sh", script).map_err(zip_err)?;
        zip.write_all(install_script().as_bytes())?;

        zip.start_file("README.md", doc).map_err(zip_err)?;
        zip.write_all(readme(&cfg.node.name).as_bytes())?;

        zip.finish().map_err(zip_err)?;
    }
    Ok(buf)
}

fn zip_err(e: zip::result::ZipError) -> Error {
    Error::Other(format!("bundle archive: {e}"))
}

/// Minimal POSIX agent: registers, heartbeats, and reports honeytoken
/// file access by watching mtimes. Real deployments replace this with
/// the packaged agent; the wire contract is identical.
fn agent_script() -> &'static str {
    r#"#!/bin/sh
# DecoyNet node agent.
# Reads config.json next to this script; requires curl and a POSIX shell.
set -eu

DIR=$(dirname "$0")
CONF="$DIR/config.json"
BACKEND=$(sed -n 's/.*"backend_url": *"\([^"]*\)".*/\1/p' "$CONF")
NODE_ID=$(sed -n 's/.*"node_id": *"\([^"]*\)".*/\1/p' "$CONF")
NODE_KEY=$(sed -n 's/.*"node_api_key": *"\([^"]*\)".*/\1/p' "$CONF")
WATCH_DIR="${DECOYNET_WATCH_DIR:-$DIR/decoys}"

now() { date -u +%Y-%m-%dT%H:%M:%SZ; }

curl -fsS -X POST "$BACKEND/agent/register" \
  -H 'content-type: application/json' \
  -d "{\"node_id\":\"$NODE_ID\",\"node_api_key\":\"$NODE_KEY\",\"hostname\":\"$(hostname)\",\"os\":\"$(uname -s)\"}"

mkdir -p "$WATCH_DIR"
STAMP="$DIR/.decoynet-stamp"
touch "$STAMP"

while :; do
    curl -fsS -X POST "$BACKEND/agent/heartbeat" \
      -H 'content-type: application/json' \
      -d "{\"node_id\":\"$NODE_ID\",\"node_api_key\":\"$NODE_KEY\"}" || true

    # Any decoy file touched since the last sweep is reported.
    find "$WATCH_DIR" -type f -newer "$STAMP" | while read -r f; do
        curl -fsS -X POST "$BACKEND/agent-alert" \
          -H 'content-type: application/json' \
          -H "X-Node-Id: $NODE_ID" -H "X-Node-Key: $NODE_KEY" \
          -d "{\"hostname\":\"$(hostname)\",\"username\":\"$(id -un)\",\"file_accessed\":\"$(basename "$f")\",\"file_path\":\"$f\",\"action\":\"modified\",\"severity\":\"high\",\"alert_kind\":\"honeytoken_access\",\"timestamp\":\"$(now)\"}" || true
    done
    touch "$STAMP"

    sleep 30
done
"#
}

fn install_script() -> &'static str {
    r#"#!/bin/sh
# Install the DecoyNet agent under /opt/decoynet and start it.
set -eu

DEST=/opt/decoynet
DIR=$(dirname "$0")

mkdir -p "$DEST"
cp "$DIR/agent.sh" "$DIR/config.json" "$DEST/"
chmod 600 "$DEST/config.json"
chmod 755 "$DEST/agent.sh"

nohup "$DEST/agent.sh" >/var/log/decoynet-agent.log 2>&1 &
echo "DecoyNet agent installed to $DEST (log: /var/log/decoynet-agent.log)"
"#
}

fn readme(node_name: &str) -> String {
    format!(
        r#"# DecoyNet agent bundle — {node_name}

This bundle is generated per node and contains a live credential.
Treat `config.json` as a secret: downloading a new bundle rotates the
key and invalidates this one.

## Quick start

    unzip agent-<node_id>.zip -d decoynet-agent
    cd decoynet-agent
    sudo ./install.sh

The agent registers the node, heartbeats every 30 seconds, and reports
access to any file under its watch directory (default: `./decoys`,
override with `DECOYNET_WATCH_DIR`).
"#
    )
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use dn_domain::NodeStatus;
    use std::io::Read;
    use uuid::Uuid;

    fn sample_node() -> Node {
        Node {
            node_id: "node-123".into(),
            owner_id: Uuid::new_v4(),
            name: "edge-1".into(),
            status: NodeStatus::Active,
            api_key_hash: "h".into(),
            hostname: None,
            os: None,
            last_seen: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn bundle_is_a_zip_with_expected_entries() {
        let node = sample_node();
        let bytes = build_agent_bundle(&BundleConfig {
            node: &node,
            node_api_key: "nk_abc",
            backend_url: "http://backend:8080",
            classifier_url: "http://clf:8100",
        })
        .unwrap();

        // Zip local-file-header magic.
        assert_eq!(&bytes[..2], b"PK");

        let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        let names: Vec<String> = (0..archive.len())
            .map(|i| archive.by_index(i).unwrap().name().to_string())
            .collect();
        assert_eq!(
            names,
            vec!["config.json", "agent.sh", "install.sh", "README.md"]
        );

        let mut config = String::new();
        archive
            .by_name("config.json")
            .unwrap()
            .read_to_string(&mut config)
            .unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&config).unwrap();
        assert_eq!(parsed["node_id"], "node-123");
        assert_eq!(parsed["node_api_key"], "nk_abc");
        assert_eq!(parsed["backend_url"], "http://backend:8080");
        assert_eq!(parsed["classifier_url"], "http://clf:8100");
        assert!(parsed["version"].as_str().is_some());
    }

    #[test]
    fn agent_script_reads_the_config_keys_it_needs() {
        let script = agent_script();
        assert!(script.contains("backend_url"));
        assert!(script.contains("/agent/register"));
        assert!(script.contains("/agent/heartbeat"));
        assert!(script.contains("/agent-alert"));
        assert!(script.contains("X-Node-Key"));
    }
}
