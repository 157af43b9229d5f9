//! Typed request and response records for the daemon commands the client
//! wraps.
//!
//! Field attributes are the schema the generic converter consults: `rename`
//! declares the wire name, `alias` accepts the daemon's alternate
//! hyphen/underscore spelling, and `skip_serializing_if` marks optional
//! fields that are omitted from requests when empty. The daemon itself is
//! not consistent about separators across nested structures, so decode
//! accepts both while encode sticks to one canonical spelling per field.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::convert::yes_no;

/// An IKE connection definition, loaded with `load-conn` and returned by
/// `list-conns`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IkeConf {
    #[serde(alias = "local-addrs", default)]
    pub local_addrs: Vec<String>,
    #[serde(alias = "remote-addrs", default, skip_serializing_if = "Vec::is_empty")]
    pub remote_addrs: Vec<String>,
    #[serde(alias = "local-port", default, skip_serializing_if = "String::is_empty")]
    pub local_port: String,
    #[serde(alias = "remote-port", default, skip_serializing_if = "String::is_empty")]
    pub remote_port: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub proposals: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub vips: Vec<String>,
    /// IKE major version; "0" accepts both IKEv1 and IKEv2.
    #[serde(default)]
    pub version: String,
    #[serde(with = "yes_no", default)]
    pub encap: bool,
    #[serde(default)]
    pub keyingtries: String,
    #[serde(alias = "rekey-time", default)]
    pub rekey_time: String,
    #[serde(alias = "dpd-delay", default, skip_serializing_if = "String::is_empty")]
    pub dpd_delay: String,
    #[serde(alias = "dpd-timeout", default, skip_serializing_if = "String::is_empty")]
    pub dpd_timeout: String,
    #[serde(rename = "local", default)]
    pub local_auth: AuthConf,
    #[serde(rename = "remote", default)]
    pub remote_auth: AuthConf,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub pools: Vec<String>,
    #[serde(default)]
    pub children: HashMap<String, ChildSaConf>,
    #[serde(with = "yes_no", default, skip_serializing_if = "yes_no::is_no")]
    pub mobike: bool,
    #[serde(with = "yes_no", default, skip_serializing_if = "yes_no::is_no")]
    pub aggressive: bool,
    #[serde(
        with = "yes_no",
        alias = "send-certreq",
        default,
        skip_serializing_if = "yes_no::is_no"
    )]
    pub send_certreq: bool,
    #[serde(with = "yes_no", default, skip_serializing_if = "yes_no::is_no")]
    pub pull: bool,
    #[serde(alias = "if-id-in", default, skip_serializing_if = "String::is_empty")]
    pub if_id_in: String,
    #[serde(alias = "if-id-out", default, skip_serializing_if = "String::is_empty")]
    pub if_id_out: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub dscp: String,
    #[serde(alias = "rand-time", default, skip_serializing_if = "String::is_empty")]
    pub rand_time: String,
    #[serde(alias = "over-time", default, skip_serializing_if = "String::is_empty")]
    pub over_time: String,
    #[serde(alias = "reauth-time", default, skip_serializing_if = "String::is_empty")]
    pub reauth_time: String,
    #[serde(with = "yes_no", default, skip_serializing_if = "yes_no::is_no")]
    pub fragmentation: bool,
}

/// A CHILD SA definition nested under an [`IkeConf`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChildSaConf {
    #[serde(alias = "local-ts", default)]
    pub local_ts: Vec<String>,
    #[serde(alias = "remote-ts", default)]
    pub remote_ts: Vec<String>,
    #[serde(alias = "esp-proposals", default, skip_serializing_if = "Vec::is_empty")]
    pub esp_proposals: Vec<String>,
    /// none, trap, or start.
    #[serde(alias = "start-action", default)]
    pub start_action: String,
    #[serde(alias = "close-action", default)]
    pub close_action: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub reqid: String,
    #[serde(alias = "rekey-time", default)]
    pub rekey_time: String,
    #[serde(alias = "replay-window", default, skip_serializing_if = "String::is_empty")]
    pub replay_window: String,
    /// tunnel, transport, beet, drop, or pass.
    #[serde(default)]
    pub mode: String,
    #[serde(default)]
    pub policies: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub updown: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub priority: String,
    #[serde(alias = "mark-in", default, skip_serializing_if = "String::is_empty")]
    pub mark_in: String,
    #[serde(alias = "mark-out", default, skip_serializing_if = "String::is_empty")]
    pub mark_out: String,
    #[serde(alias = "dpd-action", default, skip_serializing_if = "String::is_empty")]
    pub dpd_action: String,
    #[serde(alias = "life-time", default, skip_serializing_if = "String::is_empty")]
    pub life_time: String,
}

/// One authentication round of a connection.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AuthConf {
    #[serde(default)]
    pub id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub round: String,
    /// psk or pubkey.
    #[serde(rename = "auth", default)]
    pub auth_method: String,
    #[serde(alias = "eap-id", default, skip_serializing_if = "String::is_empty")]
    pub eap_id: String,
    /// PEM encoded public keys.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub pubkeys: Vec<String>,
}

/// A shared secret for `load-shared`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SharedKey {
    /// Unique identifier of the secret, used by `get-shared` listings.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    /// IKE, EAP, XAUTH, or NTLM.
    #[serde(rename = "type", default)]
    pub typ: String,
    #[serde(default)]
    pub data: String,
    /// Identities this secret is usable with.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub owners: Vec<String>,
}

/// Parameters for `terminate`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TerminateRequest {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub child: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub ike: String,
    #[serde(alias = "child-id", default, skip_serializing_if = "String::is_empty")]
    pub child_id: String,
    #[serde(alias = "ike-id", default, skip_serializing_if = "String::is_empty")]
    pub ike_id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub force: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub timeout: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub loglevel: String,
}

/// Parameters for `unload-conn`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UnloadConnRequest {
    pub name: String,
}

/// The daemon's `version` response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Version {
    pub daemon: String,
    pub version: String,
    pub sysname: String,
    pub release: String,
    pub machine: String,
}

/// One IKE SA as reported by `list-sas`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IkeSa {
    pub uniqueid: String,
    pub version: String,
    pub state: String,
    #[serde(rename = "local-host", alias = "local_host")]
    pub local_host: String,
    #[serde(rename = "local-port", alias = "local_port")]
    pub local_port: String,
    #[serde(rename = "local-id", alias = "local_id")]
    pub local_id: String,
    #[serde(rename = "remote-host", alias = "remote_host")]
    pub remote_host: String,
    #[serde(rename = "remote-port", alias = "remote_port")]
    pub remote_port: String,
    #[serde(rename = "remote-id", alias = "remote_id")]
    pub remote_id: String,
    #[serde(with = "yes_no", skip_serializing_if = "yes_no::is_no")]
    pub initiator: bool,
    #[serde(rename = "initiator-spi", alias = "initiator_spi")]
    pub initiator_spi: String,
    #[serde(rename = "responder-spi", alias = "responder_spi")]
    pub responder_spi: String,
    #[serde(rename = "encr-alg", alias = "encr_alg")]
    pub encr_alg: String,
    #[serde(rename = "encr-keysize", alias = "encr_keysize")]
    pub encr_keysize: String,
    #[serde(rename = "integ-alg", alias = "integ_alg")]
    pub integ_alg: String,
    #[serde(rename = "prf-alg", alias = "prf_alg")]
    pub prf_alg: String,
    #[serde(rename = "dh-group", alias = "dh_group")]
    pub dh_group: String,
    pub established: String,
    #[serde(rename = "rekey-time", alias = "rekey_time")]
    pub rekey_time: String,
    #[serde(rename = "reauth-time", alias = "reauth_time")]
    pub reauth_time: String,
    #[serde(rename = "child-sas", alias = "child_sas")]
    pub child_sas: HashMap<String, ChildSa>,
}

/// One CHILD SA nested under an [`IkeSa`] listing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChildSa {
    pub name: String,
    pub uniqueid: String,
    pub reqid: String,
    pub state: String,
    pub mode: String,
    pub protocol: String,
    #[serde(with = "yes_no", skip_serializing_if = "yes_no::is_no")]
    pub encap: bool,
    #[serde(rename = "spi-in", alias = "spi_in")]
    pub spi_in: String,
    #[serde(rename = "spi-out", alias = "spi_out")]
    pub spi_out: String,
    #[serde(rename = "encr-alg", alias = "encr_alg")]
    pub encr_alg: String,
    #[serde(rename = "encr-keysize", alias = "encr_keysize")]
    pub encr_keysize: String,
    #[serde(rename = "integ-alg", alias = "integ_alg")]
    pub integ_alg: String,
    #[serde(rename = "bytes-in", alias = "bytes_in")]
    pub bytes_in: String,
    #[serde(rename = "packets-in", alias = "packets_in")]
    pub packets_in: String,
    #[serde(rename = "bytes-out", alias = "bytes_out")]
    pub bytes_out: String,
    #[serde(rename = "packets-out", alias = "packets_out")]
    pub packets_out: String,
    #[serde(rename = "rekey-time", alias = "rekey_time")]
    pub rekey_time: String,
    #[serde(rename = "life-time", alias = "life_time")]
    pub life_time: String,
    #[serde(rename = "install-time", alias = "install_time")]
    pub install_time: String,
    #[serde(rename = "local-ts", alias = "local_ts")]
    pub local_ts: Vec<String>,
    #[serde(rename = "remote-ts", alias = "remote_ts")]
    pub remote_ts: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::convert::{from_general, to_general};
    use crate::protocol::Section;

    #[test]
    fn test_conn_request_shape() {
        let mut children = HashMap::new();
        children.insert(
            "net-net".to_string(),
            ChildSaConf {
                local_ts: vec!["10.10.59.0/24".to_string()],
                remote_ts: vec!["10.10.40.0/24".to_string()],
                esp_proposals: vec!["aes256-sha256-modp2048".to_string()],
                start_action: "start".to_string(),
                mode: "tunnel".to_string(),
                ..Default::default()
            },
        );
        let conn = IkeConf {
            local_addrs: vec!["192.168.198.16".to_string()],
            remote_addrs: vec!["192.168.198.11".to_string()],
            version: "2".to_string(),
            encap: true,
            local_auth: AuthConf {
                id: "192.168.198.16".to_string(),
                auth_method: "psk".to_string(),
                ..Default::default()
            },
            children,
            ..Default::default()
        };

        let tree = to_general(&conn).unwrap();
        assert_eq!(tree.text("version"), Some("2"));
        assert_eq!(tree.text("encap"), Some("yes"));
        // Empty optional fields stay off the wire entirely.
        assert!(tree.get("dpd_delay").is_none());
        assert!(tree.get("mobike").is_none());
        // Auth rounds use their wire names, not the field names.
        assert_eq!(tree.section("local").unwrap().text("auth"), Some("psk"));

        let child = tree
            .section("children")
            .and_then(|c| c.section("net-net"))
            .unwrap();
        assert_eq!(child.text("mode"), Some("tunnel"));
        assert_eq!(child.list("local_ts").unwrap(), &["10.10.59.0/24"]);
    }

    #[test]
    fn test_sa_listing_accepts_daemon_spelling() {
        let child = Section::new()
            .with("state", "INSTALLED")
            .with("mode", "TUNNEL")
            .with("spi-in", "c9f1a2b3")
            .with("bytes-in", "1024")
            .with("local-ts", vec!["10.0.0.0/24"]);
        let sa = Section::new()
            .with("uniqueid", "1")
            .with("version", "2")
            .with("state", "ESTABLISHED")
            .with("local-host", "192.0.2.1")
            .with("remote-host", "198.51.100.7")
            .with("initiator", "yes")
            .with("child-sas", Section::new().with("net-net-1", child));

        let parsed: IkeSa = from_general(&sa).unwrap();
        assert_eq!(parsed.state, "ESTABLISHED");
        assert_eq!(parsed.local_host, "192.0.2.1");
        assert!(parsed.initiator);

        let child = &parsed.child_sas["net-net-1"];
        assert_eq!(child.spi_in, "c9f1a2b3");
        assert_eq!(child.bytes_in, "1024");
        assert_eq!(child.local_ts, vec!["10.0.0.0/24"]);
    }

    #[test]
    fn test_conf_roundtrip_through_tree() {
        let conf = ChildSaConf {
            local_ts: vec!["10.1.0.0/16".to_string()],
            remote_ts: vec!["10.2.0.0/16".to_string()],
            start_action: "trap".to_string(),
            mode: "tunnel".to_string(),
            policies: "no".to_string(),
            ..Default::default()
        };
        let back: ChildSaConf = from_general(&to_general(&conf).unwrap()).unwrap();
        assert_eq!(back, conf);
    }

    #[test]
    fn test_terminate_request_omits_unset_fields() {
        let request = TerminateRequest {
            ike: "gw-a".to_string(),
            force: "true".to_string(),
            timeout: "-1".to_string(),
            ..Default::default()
        };
        let tree = to_general(&request).unwrap();
        assert_eq!(tree.len(), 3);
        assert_eq!(tree.text("ike"), Some("gw-a"));
        assert!(tree.get("child").is_none());
        assert!(tree.get("loglevel").is_none());
    }
}
