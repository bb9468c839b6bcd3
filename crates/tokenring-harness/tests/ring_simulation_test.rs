//! End-to-end ring runs.
//!
//! Turmoil runs exercise the framed TCP transport under simulated latency;
//! in-memory runs explore delivery interleavings and duplicates under
//! proptest. Both check the standard invariants on the final state.

use std::time::Duration;

use proptest::prelude::*;
use tokenring_harness::{InvariantRegistry, SimConfig, SimError, TestRing, run_simulation};

#[test]
fn three_node_ring_over_turmoil() {
    let report = run_simulation(&SimConfig::new(3, 12)).expect("simulation failed");

    InvariantRegistry::standard().assert_all(&report.snapshot(), "after turmoil run");
    assert_eq!(report.nodes.iter().filter(|n| n.completed_setup).count(), 1);

    insta::assert_json_snapshot!(report, {
        ".nodes[].completed_setup" => "[setup]",
    }, @r#"
    {
      "num_nodes": 3,
      "counter_limit": 12,
      "nodes": [
        {
          "node": 0,
          "collected": [
            2,
            3,
            5,
            6,
            8,
            9,
            11,
            12
          ],
          "broadcasted": [
            1,
            4,
            7,
            10
          ],
          "stopping": true,
          "verified": true,
          "halted": true,
          "completed_setup": "[setup]"
        },
        {
          "node": 1,
          "collected": [
            1,
            3,
            4,
            6,
            7,
            9,
            10,
            12
          ],
          "broadcasted": [
            2,
            5,
            8,
            11
          ],
          "stopping": true,
          "verified": true,
          "halted": true,
          "completed_setup": "[setup]"
        },
        {
          "node": 2,
          "collected": [
            1,
            2,
            4,
            5,
            7,
            8,
            10,
            11
          ],
          "broadcasted": [
            3,
            6,
            9,
            12
          ],
          "stopping": true,
          "verified": true,
          "halted": true,
          "completed_setup": "[setup]"
        }
      ],
      "verified": [
        0,
        1,
        2
      ]
    }
    "#);
}

#[test]
fn larger_rings_converge_over_turmoil() {
    let registry = InvariantRegistry::standard();

    for (num_nodes, seed) in [(4, 1), (5, 2), (7, 3)] {
        let config = SimConfig::new(num_nodes, 10 * u64::from(num_nodes)).with_seed(seed);
        let report = run_simulation(&config).expect("simulation failed");

        assert!(report.all_halted(), "{num_nodes} nodes, seed {seed}");
        assert_eq!(report.verified.len(), num_nodes as usize);
        registry.assert_all(&report.snapshot(), &format!("{num_nodes} nodes, seed {seed}"));
    }
}

#[test]
fn turmoil_run_times_out_when_limit_is_unreachable() {
    let mut config = SimConfig::new(3, 100_000);
    config.simulation_duration = Duration::from_secs(2);

    assert!(matches!(run_simulation(&config), Err(SimError::Simulation(_))));
}

#[test]
fn invalid_ring_is_rejected_before_running() {
    assert!(matches!(run_simulation(&SimConfig::new(1, 12)), Err(SimError::Config(_))));
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_in_memory_ring_converges(
        seed in any::<u64>(),
        num_nodes in 3u32..7,
        extra in 0u64..40,
        duplicates in 0u16..300,
    ) {
        let limit = 3 * u64::from(num_nodes) + extra;
        let config = SimConfig::new(num_nodes, limit).with_seed(seed).with_duplicates(duplicates);

        let report = TestRing::new(config).unwrap().run().unwrap();

        prop_assert!(report.all_halted());
        prop_assert_eq!(report.verified.len(), num_nodes as usize);
        prop_assert_eq!(report.nodes.iter().filter(|n| n.completed_setup).count(), 1);

        let total: usize = report.nodes.iter().map(|n| n.broadcasted.len()).sum();
        prop_assert_eq!(total as u64, limit);

        let violations = InvariantRegistry::standard().check_all(&report.snapshot());
        prop_assert!(violations.is_ok(), "{:?}", violations);
    }
}
