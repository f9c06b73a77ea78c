//! Shard ownership table for replicas without a stable ordinal.
//!
//! Each entry pairs a shard number with the hostname of the controller that
//! last claimed it and the time of its last heartbeat. A controller refreshes
//! its own entry, or claims the first entry that is unowned or whose owner has
//! stopped heartbeating. Storage of the table is left to the caller; this
//! module only transforms it.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::Result;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ShardControllerMapping {
    pub shard_number: u32,
    #[serde(default)]
    pub controller_name: String,
    #[serde(default)]
    pub heartbeat_time: Option<DateTime<Utc>>,
}

impl ShardControllerMapping {
    pub fn unassigned(shard_number: u32) -> Self {
        Self {
            shard_number,
            controller_name: String::new(),
            heartbeat_time: None,
        }
    }

    fn claim(&mut self, hostname: &str, now: DateTime<Utc>) {
        self.controller_name = hostname.to_string();
        self.heartbeat_time = Some(now);
    }

    fn is_claimable(&self, now: DateTime<Utc>, heartbeat_timeout: Duration) -> bool {
        self.controller_name.is_empty()
            || self
                .heartbeat_time
                .map_or(true, |heartbeat| now.signed_duration_since(heartbeat) > heartbeat_timeout)
    }
}

/// One unassigned entry per shard.
pub fn default_shard_mapping(replicas: u32) -> Vec<ShardControllerMapping> {
    (0..replicas).map(ShardControllerMapping::unassigned).collect()
}

/// Table for a controller creating the mapping for the first time. It is
/// placed on `shard`, or on shard 0 if no usable shard was requested.
pub fn generate_default_shard_mapping(
    hostname: &str,
    replicas: u32,
    shard: Option<u32>,
    now: DateTime<Utc>,
) -> Vec<ShardControllerMapping> {
    let mut mapping = default_shard_mapping(replicas);
    let shard = shard.filter(|shard| *shard < replicas).unwrap_or(0);
    if let Some(entry) = mapping.get_mut(shard as usize) {
        entry.claim(hostname, now);
    }
    mapping
}

/// Find or claim the shard for `hostname` and return it with the updated
/// table.
///
/// The table is first resized to `replicas`: missing entries are appended,
/// and a table with too many entries is reset so that every controller
/// claims again. Then, in order:
///
/// 1. an explicitly requested `shard` below `replicas` is stamped with this
///    controller and a fresh heartbeat;
/// 2. otherwise the entry already owned by `hostname` gets a fresh heartbeat;
/// 3. otherwise the first unowned or stale entry is claimed.
///
/// Returns `None` as the shard if every entry is owned by a live controller.
pub fn get_or_update_shard_for_controller(
    mut mapping: Vec<ShardControllerMapping>,
    hostname: &str,
    replicas: u32,
    shard: Option<u32>,
    now: DateTime<Utc>,
    heartbeat_timeout: Duration,
) -> (Option<u32>, Vec<ShardControllerMapping>) {
    let expected = replicas as usize;
    if mapping.len() < expected {
        let missing = mapping.len() as u32..replicas;
        mapping.extend(missing.map(ShardControllerMapping::unassigned));
    }
    if mapping.len() > expected {
        info!(
            entries = mapping.len(),
            replicas, "shard mapping has more entries than replicas, resetting"
        );
        mapping = default_shard_mapping(replicas);
    }

    let mut assigned = None;
    match shard.filter(|shard| *shard < replicas) {
        Some(requested) => {
            if let Some(entry) = mapping.iter_mut().find(|e| e.shard_number == requested) {
                debug!(shard = requested, hostname, "updating heartbeat for requested shard");
                entry.claim(hostname, now);
                assigned = Some(requested);
            }
        }
        None => {
            if let Some(entry) = mapping.iter_mut().find(|e| e.controller_name == hostname) {
                debug!(shard = entry.shard_number, hostname, "updating heartbeat");
                entry.heartbeat_time = Some(now);
                assigned = Some(entry.shard_number);
            }
        }
    }

    if assigned.is_none() {
        if let Some(entry) = mapping
            .iter_mut()
            .find(|e| e.is_claimable(now, heartbeat_timeout))
        {
            info!(
                shard = entry.shard_number,
                hostname,
                previous_owner = %entry.controller_name,
                "claimed shard"
            );
            entry.claim(hostname, now);
            assigned = Some(entry.shard_number);
        }
    }

    (assigned, mapping)
}

pub fn encode_shard_mapping(mapping: &[ShardControllerMapping]) -> Result<String> {
    Ok(serde_json::to_string(mapping)?)
}

pub fn decode_shard_mapping(data: &str) -> Result<Vec<ShardControllerMapping>> {
    Ok(serde_json::from_str(data)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use chrono::TimeZone;
    use rstest::rstest;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    fn long_ago() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2001, 1, 1, 0, 0, 0).unwrap()
    }

    fn timeout() -> Duration {
        Duration::seconds(30)
    }

    fn entry(shard: u32, name: &str, heartbeat: Option<DateTime<Utc>>) -> ShardControllerMapping {
        ShardControllerMapping {
            shard_number: shard,
            controller_name: name.to_string(),
            heartbeat_time: heartbeat,
        }
    }

    #[test]
    fn existing_controller_keeps_its_shard_when_table_grows() {
        let mapping = vec![entry(0, "test-example", Some(long_ago()))];
        let (shard, mapping) =
            get_or_update_shard_for_controller(mapping, "test-example", 2, None, now(), timeout());

        assert_eq!(shard, Some(0));
        assert_eq!(
            mapping,
            vec![entry(0, "test-example", Some(now())), entry(1, "", None)]
        );
    }

    #[test]
    fn new_controller_claims_empty_shard() {
        let mapping = vec![entry(0, "test-example", Some(now()))];
        let (shard, mapping) =
            get_or_update_shard_for_controller(mapping, "test-example-1", 2, None, now(), timeout());

        assert_eq!(shard, Some(1));
        assert_eq!(
            mapping,
            vec![
                entry(0, "test-example", Some(now())),
                entry(1, "test-example-1", Some(now())),
            ]
        );
    }

    #[test]
    fn oversized_table_is_reset() {
        let mapping = vec![
            entry(0, "test-example", Some(now())),
            entry(1, "test-example-1", Some(now())),
        ];
        let (shard, mapping) =
            get_or_update_shard_for_controller(mapping, "test-example", 1, None, now(), timeout());

        assert_eq!(shard, Some(0));
        assert_eq!(mapping, vec![entry(0, "test-example", Some(now()))]);
    }

    #[test]
    fn requested_shard_is_stamped_in_place() {
        let mapping = vec![
            entry(1, "test-example-1", Some(long_ago())),
            entry(0, "test-example", Some(now())),
        ];
        let (shard, mapping) = get_or_update_shard_for_controller(
            mapping,
            "test-example-1",
            2,
            Some(1),
            now(),
            timeout(),
        );

        assert_eq!(shard, Some(1));
        assert_eq!(
            mapping,
            vec![
                entry(1, "test-example-1", Some(now())),
                entry(0, "test-example", Some(now())),
            ]
        );
    }

    #[test]
    fn requested_shard_on_padded_table() {
        let mapping = vec![entry(0, "test-example", Some(now()))];
        let (shard, mapping) = get_or_update_shard_for_controller(
            mapping,
            "test-example-1",
            2,
            Some(1),
            now(),
            timeout(),
        );

        assert_eq!(shard, Some(1));
        assert_eq!(mapping[1], entry(1, "test-example-1", Some(now())));
    }

    #[test]
    fn requested_shard_on_reset_table() {
        let mapping = vec![
            entry(0, "test-example", Some(now())),
            entry(1, "test-example-1", Some(now())),
            entry(2, "test-example-2", Some(now())),
        ];
        let (shard, mapping) = get_or_update_shard_for_controller(
            mapping,
            "test-example",
            2,
            Some(1),
            now(),
            timeout(),
        );

        assert_eq!(shard, Some(1));
        assert_eq!(
            mapping,
            vec![entry(0, "", None), entry(1, "test-example", Some(now()))]
        );
    }

    #[test]
    fn out_of_range_request_falls_back_to_lookup() {
        let mapping = vec![
            entry(0, "test-example", Some(now())),
            entry(1, "test-example-1", Some(now())),
        ];
        let (shard, _) = get_or_update_shard_for_controller(
            mapping,
            "test-example-1",
            2,
            Some(5),
            now(),
            timeout(),
        );
        assert_eq!(shard, Some(1));
    }

    #[test]
    fn own_entry_heartbeat_is_refreshed() {
        let mapping = vec![
            entry(0, "test-example", Some(now())),
            entry(1, "test-example-1", Some(long_ago())),
        ];
        let (shard, mapping) =
            get_or_update_shard_for_controller(mapping, "test-example-1", 2, None, now(), timeout());

        assert_eq!(shard, Some(1));
        assert_eq!(mapping[1], entry(1, "test-example-1", Some(now())));
    }

    #[test]
    fn stale_owner_is_replaced() {
        let mapping = vec![
            entry(0, "alive", Some(now() - Duration::seconds(10))),
            entry(1, "dead", Some(now() - Duration::seconds(31))),
        ];
        let (shard, mapping) =
            get_or_update_shard_for_controller(mapping, "newcomer", 2, None, now(), timeout());

        assert_eq!(shard, Some(1));
        assert_eq!(mapping[0].controller_name, "alive");
        assert_eq!(mapping[1], entry(1, "newcomer", Some(now())));
    }

    #[test]
    fn heartbeat_at_exact_timeout_is_still_alive() {
        let mapping = vec![entry(0, "alive", Some(now() - timeout()))];
        let (shard, mapping) =
            get_or_update_shard_for_controller(mapping, "newcomer", 1, None, now(), timeout());

        assert_eq!(shard, None);
        assert_eq!(mapping[0].controller_name, "alive");
    }

    #[rstest]
    #[case::unset(None, 0)]
    #[case::requested(Some(2), 2)]
    #[case::out_of_range(Some(3), 0)]
    fn test_generate_default(#[case] shard: Option<u32>, #[case] expected: usize) {
        let mapping = generate_default_shard_mapping("controller", 3, shard, now());
        assert_eq!(mapping.len(), 3);
        for (index, entry) in mapping.iter().enumerate() {
            assert_eq!(entry.shard_number as usize, index);
            if index == expected {
                assert_eq!(entry.controller_name, "controller");
                assert_eq!(entry.heartbeat_time, Some(now()));
            } else {
                assert_eq!(entry, &ShardControllerMapping::unassigned(index as u32));
            }
        }
    }

    #[test]
    fn generate_default_with_no_replicas_is_empty() {
        assert!(generate_default_shard_mapping("controller", 0, None, now()).is_empty());
    }

    #[test]
    fn json_uses_pascal_case() {
        let encoded = encode_shard_mapping(&[
            entry(0, "controller-0", Some(now())),
            entry(1, "", None),
        ])
        .unwrap();
        assert_eq!(
            encoded,
            r#"[{"ShardNumber":0,"ControllerName":"controller-0","HeartbeatTime":"2024-05-01T12:00:00Z"},{"ShardNumber":1,"ControllerName":"","HeartbeatTime":null}]"#
        );

        let decoded = decode_shard_mapping(&encoded).unwrap();
        assert_eq!(decoded[0], entry(0, "controller-0", Some(now())));
        assert_eq!(decoded[1], entry(1, "", None));
    }

    #[test]
    fn decode_tolerates_missing_fields() {
        let decoded = decode_shard_mapping(r#"[{"ShardNumber":3}]"#).unwrap();
        assert_eq!(decoded, vec![ShardControllerMapping::unassigned(3)]);
    }

    #[test]
    fn decode_rejects_garbage() {
        assert!(matches!(
            decode_shard_mapping("not json"),
            Err(Error::ShardMapping(_))
        ));
    }
}
