//! Tests for storage module

#[cfg(test)]
mod tests {
    use crate::storage::{AnimalQuery, SnapshotBuffer};
    use crate::testing::TestDataGenerator;
    use chrono::{Duration, Utc};
    use std::sync::Arc;

    #[test]
    fn test_push_and_dump_preserves_order() {
        let buffer = SnapshotBuffer::default();
        let mut gen = TestDataGenerator::new();

        let first = gen.plot("A", vec![]);
        let second = gen.plot("B", vec![]);
        let third = gen.plot("C", vec![]);
        buffer.push(gen.job(vec![first, second]));
        buffer.push(gen.job(vec![third]));

        let signs: Vec<_> = buffer.dump().into_iter().map(|p| p.plot_sign).collect();
        assert_eq!(signs, vec!["A", "B", "C"]);
        assert_eq!(buffer.len(), 2);
    }

    #[test]
    fn test_expired_jobs_are_not_dumped() {
        let buffer = SnapshotBuffer::new(60);
        let mut gen = TestDataGenerator::new();
        let now = Utc::now();

        let old_plot = gen.plot("old", vec![]);
        let fresh_plot = gen.plot("fresh", vec![]);
        buffer.push_at(gen.job(vec![old_plot]), now - Duration::seconds(61));
        buffer.push_at(gen.job(vec![fresh_plot]), now - Duration::seconds(10));

        let plots = buffer.dump_at(now);
        assert_eq!(plots.len(), 1);
        assert_eq!(plots[0].plot_sign, "fresh");
    }

    #[test]
    fn test_job_at_exact_ttl_boundary_is_kept() {
        let buffer = SnapshotBuffer::new(60);
        let mut gen = TestDataGenerator::new();
        let now = Utc::now();

        buffer.push_at(gen.job(vec![]), now - Duration::seconds(60));
        assert_eq!(buffer.dump_jobs_at(now).len(), 1);
        assert_eq!(buffer.dump_jobs_at(now + Duration::milliseconds(1)).len(), 0);
    }

    #[test]
    fn test_push_evicts() {
        let buffer = SnapshotBuffer::new(60);
        let mut gen = TestDataGenerator::new();
        let start = Utc::now();

        buffer.push_at(gen.job(vec![]), start);
        buffer.push_at(gen.job(vec![]), start + Duration::seconds(120));
        assert_eq!(buffer.len(), 1);
    }

    #[test]
    fn test_evict_reports_dropped_count() {
        let buffer = SnapshotBuffer::new(1);
        let mut gen = TestDataGenerator::new();
        let now = Utc::now();

        buffer.push_at(gen.job(vec![]), now);
        buffer.push_at(gen.job(vec![]), now);
        assert_eq!(buffer.evict(now + Duration::seconds(5)), 2);
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_filter_excludes_pending_values() {
        let buffer = SnapshotBuffer::default();
        let mut gen = TestDataGenerator::new();

        let podiums = vec![
            gen.animal("Ready", "Secret", Some(6_000_000.0)),
            gen.animal("Pending", "Secret", None),
            gen.empty(),
        ];
        let plot = gen.plot("P1", podiums);
        buffer.push(gen.job(vec![plot]));

        let all = buffer.filter_animals(&AnimalQuery::default());
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].display_name, "Ready");

        let query = AnimalQuery {
            min_per_second: Some(5_000_000.0),
            ..AnimalQuery::default()
        };
        let rich = buffer.filter_animals(&query);
        assert!(rich.iter().all(|m| m.generation.per_second.is_some()));
        assert_eq!(rich.len(), 1);
    }

    #[test]
    fn test_filter_by_mutation_rarity_and_minimum() {
        let buffer = SnapshotBuffer::default();
        let mut gen = TestDataGenerator::new();

        let podiums = vec![
            gen.mutated_animal("Gold Cow", "Gold", "Secret", Some(2_000_000.0)),
            gen.mutated_animal("Rainbow Cow", "Rainbow", "Secret", Some(9_000_000.0)),
            gen.mutated_animal("Gold Cat", "Gold", "Mythic", Some(50_000.0)),
        ];
        let plot = gen.plot("P1", podiums);
        buffer.push(gen.job(vec![plot]));

        let gold = buffer.filter_animals(&AnimalQuery {
            mutation: Some("Gold".to_string()),
            ..AnimalQuery::default()
        });
        assert_eq!(gold.len(), 2);

        let gold_secret = buffer.filter_animals(&AnimalQuery {
            mutation: Some("Gold".to_string()),
            rarity: Some("Secret".to_string()),
            ..AnimalQuery::default()
        });
        assert_eq!(gold_secret.len(), 1);
        assert_eq!(gold_secret[0].display_name, "Gold Cow");

        let over_5m = buffer.filter_animals(&AnimalQuery {
            min_per_second: Some(5_000_000.0),
            ..AnimalQuery::default()
        });
        assert_eq!(over_5m.len(), 1);
        assert_eq!(over_5m[0].display_name, "Rainbow Cow");
        assert_eq!(over_5m[0].plot_sign, "P1");
    }

    #[test]
    fn test_filter_ignores_expired_jobs() {
        let buffer = SnapshotBuffer::new(60);
        let mut gen = TestDataGenerator::new();
        let now = Utc::now();

        let podium = gen.animal("Old", "Secret", Some(1.0));
        let plot = gen.plot("P", vec![podium]);
        buffer.push_at(gen.job(vec![plot]), now - Duration::seconds(90));

        assert!(buffer.filter_animals_at(&AnimalQuery::default(), now).is_empty());
    }

    #[test]
    fn test_concurrent_pushes_are_not_lost() {
        let buffer = Arc::new(SnapshotBuffer::default());
        let handles: Vec<_> = (0..8)
            .map(|t| {
                let buffer = Arc::clone(&buffer);
                std::thread::spawn(move || {
                    let mut gen = TestDataGenerator::new();
                    for i in 0..25 {
                        buffer.push(gen.job_with_id(&format!("{}-{}", t, i), vec![]));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(buffer.dump_jobs().len(), 200);
    }
}
