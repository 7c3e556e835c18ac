//! Property tests for the hierarchical sample generator and grouping.

use nested_sim::analytics::grouping::{count_by, group_means, unique_count, GroupKey};
use nested_sim::config::{CountRange, EffectSds, LevelSd, NestingMode, SimulationConfig};
use nested_sim::simulation::generate;
use proptest::prelude::*;

const TOLERANCE: f64 = 1e-9;

fn arb_range(lo: u32, hi: u32) -> impl Strategy<Value = CountRange> {
    (lo..=hi, 0u32..=hi).prop_map(|(min, extra)| CountRange::new(min, min + extra))
}

fn arb_level_sd() -> impl Strategy<Value = LevelSd> {
    (0.0f64..6.0, 0.0f64..2.0).prop_map(|(intercept, slope)| LevelSd::new(intercept, slope))
}

fn arb_config() -> impl Strategy<Value = SimulationConfig> {
    (
        1u32..8,
        1u32..6,
        arb_range(1, 40),
        arb_range(1, 6),
        (arb_level_sd(), arb_level_sd(), arb_level_sd()),
        prop_oneof![Just(NestingMode::Nested), Just(NestingMode::Independent)],
        any::<u64>(),
    )
        .prop_map(
            |(num_mountains, num_genera, obs, species, (sp, ge, mo), nesting, seed)| {
                SimulationConfig {
                    num_mountains,
                    num_genera,
                    obs_per_mountain: obs,
                    species_per_genus: species,
                    sds: EffectSds { species: sp, genus: ge, mountain: mo },
                    nesting,
                    seed: Some(seed),
                    ..Default::default()
                }
            },
        )
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn rows_per_mountain_match_sampled_counts(config in arb_config()) {
        let results = generate(config.clone()).unwrap();
        let design = &results.design;

        prop_assert_eq!(design.obs_per_mountain.len() as u32, config.num_mountains);
        for &count in &design.obs_per_mountain {
            prop_assert!(count >= config.obs_per_mountain.min);
            prop_assert!(count <= config.obs_per_mountain.max);
        }

        let counts = count_by(results.table.rows(), GroupKey::Mountain);
        for (idx, &expected) in design.obs_per_mountain.iter().enumerate() {
            let mountain = idx as u32 + 1;
            prop_assert_eq!(counts.get(&mountain).copied().unwrap_or(0), expected);
        }

        for obs in results.table.iter() {
            prop_assert!(obs.mountain >= 1 && obs.mountain <= config.num_mountains);
            prop_assert!(obs.genus >= 1 && obs.genus <= config.num_genera);
            prop_assert!(obs.species >= 1 && obs.species <= design.total_species());
        }
    }

    #[test]
    fn totals_are_sums_of_counts(config in arb_config()) {
        let results = generate(config).unwrap();
        let design = &results.design;

        prop_assert_eq!(results.table.len() as u32, design.obs_per_mountain.iter().sum::<u32>());
        prop_assert_eq!(results.summary.total_species, design.species_per_genus.iter().sum::<u32>());
        prop_assert_eq!(design.species_genus.len() as u32, results.summary.total_species);
        prop_assert_eq!(results.effects.species.len() as u32, results.summary.total_species);
    }

    #[test]
    fn weight_reproducible_from_effects(config in arb_config()) {
        let results = generate(config).unwrap();

        for obs in results.table.iter() {
            let predicted = results.predicted_weight(obs);
            prop_assert!((predicted - obs.weight).abs() <= TOLERANCE * (1.0 + obs.weight.abs()));
        }
    }

    #[test]
    fn nested_mode_respects_species_owner(config in arb_config()) {
        let config = SimulationConfig { nesting: NestingMode::Nested, ..config };
        let results = generate(config).unwrap();

        for obs in results.table.iter() {
            prop_assert_eq!(results.design.genus_of(obs.species), Some(obs.genus));
        }
        prop_assert_eq!(results.summary.nesting_violations, 0);
    }

    #[test]
    fn group_means_are_idempotent(config in arb_config()) {
        let results = generate(config).unwrap();
        let rows = results.table.rows();

        for keys in [
            vec![GroupKey::Mountain],
            vec![GroupKey::Genus, GroupKey::Species],
            vec![GroupKey::Mountain, GroupKey::Genus, GroupKey::Species],
        ] {
            let once = group_means(rows, &keys);
            let twice = group_means(&once, &keys);
            prop_assert_eq!(once, twice);
        }
    }

    #[test]
    fn seeded_runs_replay(config in arb_config()) {
        let first = generate(config.clone()).unwrap();
        let second = generate(config).unwrap();

        prop_assert_eq!(&first.table, &second.table);
        prop_assert_eq!(first.summary.digest, second.summary.digest);
    }
}

#[test]
fn unique_species_per_mountain_with_ten_mountains() {
    let config = SimulationConfig {
        seed: Some(2024),
        ..Default::default()
    };
    let results = generate(config).unwrap();
    let unique = unique_count(results.table.rows(), GroupKey::Mountain, GroupKey::Species);

    assert_eq!(unique.len(), 10);
    for count in unique.values() {
        assert!(*count >= 1);
        assert!(*count <= results.summary.total_species);
    }
}

#[test]
fn independent_mode_can_break_nesting() {
    let config = SimulationConfig {
        num_genera: 4,
        species_per_genus: CountRange::fixed(3),
        nesting: NestingMode::Independent,
        seed: Some(11),
        ..Default::default()
    };
    let results = generate(config).unwrap();

    // With 4 genera and ~2000 rows, independent draws disagree with the declared owner.
    assert!(results.summary.nesting_violations > 0);
}

#[test]
fn zero_sd_collapses_to_fixed_line() {
    let config = SimulationConfig {
        sds: EffectSds {
            species: LevelSd::zero(),
            genus: LevelSd::zero(),
            mountain: LevelSd::zero(),
        },
        fixed_intercept: 5.0,
        fixed_slope: 2.0,
        seed: Some(3),
        ..SimulationConfig::quick_test()
    };
    let results = generate(config).unwrap();

    for obs in results.table.iter() {
        assert!((obs.weight - (5.0 + 2.0 * obs.elevation)).abs() < 1e-12);
    }
}
