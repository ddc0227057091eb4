//! Detects and repairs drift between the point ledger and the stored player aggregates.

use std::sync::Arc;

use indexmap::IndexMap;
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    config::HealthThresholds,
    dao::{
        models::{PlayerEntity, PlayerStats, SeedingPointEntity},
        seeding_store::SeedingStore,
    },
    dto::reconciliation::{
        HealthStatus, PlayerFailure, PlayerValidation, RepairAllResult, RepairResult,
        SeedingHealth, StatsDifference, ValidationReport,
    },
    error::ServiceError,
    state::SharedState,
};

/// Recompute a player's aggregate from its active ledger entries.
///
/// Points are summed over every active entry. Matches are counted once per
/// (tournament, match index) even if several active entries share it, and a match
/// counts as won if any of those entries is a winning one.
pub fn expected_stats(entries: &[SeedingPointEntity]) -> PlayerStats {
    let mut seed_points: u32 = 0;
    let mut matches: IndexMap<(Uuid, u32), bool> = IndexMap::new();

    for entry in entries.iter().filter(|entry| entry.state.is_active()) {
        seed_points = seed_points.saturating_add(entry.points);
        if let Some(key) = entry.key() {
            let won = matches.entry((key.tournament_id, key.match_index)).or_insert(false);
            *won |= entry.is_winner;
        }
    }

    PlayerStats {
        seed_points,
        matches_won: matches.values().filter(|won| **won).count() as u32,
        matches_played: matches.len() as u32,
    }
}

async fn compare(
    store: &Arc<dyn SeedingStore>,
    player: PlayerEntity,
) -> Result<PlayerValidation, ServiceError> {
    let entries = store.active_entries_for_player(player.id).await?;
    let expected = expected_stats(&entries);
    let difference = StatsDifference::between(player.stats, expected);
    Ok(PlayerValidation {
        player_id: player.id,
        name: player.name,
        stored: player.stats,
        expected,
        mismatch: !difference.is_zero(),
        difference,
    })
}

async fn load_player(
    store: &Arc<dyn SeedingStore>,
    player_id: Uuid,
) -> Result<PlayerEntity, ServiceError> {
    store
        .find_player(player_id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("player `{player_id}` not found")))
}

/// Compare one player's stored stats against the ledger.
pub async fn validate_player_stats(
    state: &SharedState,
    player_id: Uuid,
) -> Result<PlayerValidation, ServiceError> {
    let store = state.require_store().await?;
    let player = load_player(&store, player_id).await?;
    compare(&store, player).await
}

async fn validate_players(store: &Arc<dyn SeedingStore>) -> Result<ValidationReport, ServiceError> {
    let players = store.list_players().await?;
    let mut report = ValidationReport {
        total_players: players.len(),
        valid: 0,
        mismatched: 0,
        errors: 0,
        details: Vec::with_capacity(players.len()),
        failures: Vec::new(),
    };

    for player in players {
        let player_id = player.id;
        match compare(store, player).await {
            Ok(validation) => {
                if validation.mismatch {
                    report.mismatched += 1;
                } else {
                    report.valid += 1;
                }
                report.details.push(validation);
            }
            Err(err) => {
                warn!(%player_id, error = %err, "failed to validate player stats");
                report.errors += 1;
                report.failures.push(PlayerFailure {
                    player_id,
                    message: err.to_string(),
                });
            }
        }
    }

    Ok(report)
}

/// Compare every player's stored stats against the ledger.
pub async fn validate_all_players(state: &SharedState) -> Result<ValidationReport, ServiceError> {
    let store = state.require_store().await?;
    let report = validate_players(&store).await?;
    info!(
        total = report.total_players,
        valid = report.valid,
        mismatched = report.mismatched,
        errors = report.errors,
        "player stats validated"
    );
    Ok(report)
}

async fn repair(
    store: &Arc<dyn SeedingStore>,
    validation: PlayerValidation,
) -> Result<RepairResult, ServiceError> {
    let PlayerValidation {
        player_id,
        stored,
        expected,
        difference,
        mismatch,
        ..
    } = validation;

    if !mismatch {
        return Ok(RepairResult {
            player_id,
            repaired: false,
            before: stored,
            after: stored,
            delta: StatsDifference::default(),
        });
    }

    if !store.overwrite_player_stats(player_id, expected).await? {
        return Err(ServiceError::NotFound(format!("player `{player_id}` not found")));
    }
    warn!(
        %player_id,
        seed_points = difference.seed_points,
        matches_won = difference.matches_won,
        matches_played = difference.matches_played,
        "player stats repaired from ledger"
    );

    Ok(RepairResult {
        player_id,
        repaired: true,
        before: stored,
        after: expected,
        delta: difference,
    })
}

/// Overwrite one player's stats with the values derived from the ledger.
pub async fn repair_player_stats(
    state: &SharedState,
    player_id: Uuid,
) -> Result<RepairResult, ServiceError> {
    let store = state.require_store().await?;
    let player = load_player(&store, player_id).await?;
    let validation = compare(&store, player).await?;
    repair(&store, validation).await
}

/// Validate every player, then repair the mismatched ones.
pub async fn repair_all_mismatches(state: &SharedState) -> Result<RepairAllResult, ServiceError> {
    let store = state.require_store().await?;
    let report = validate_players(&store).await?;

    let mut result = RepairAllResult {
        checked: report.total_players,
        mismatched: report.mismatched,
        repaired: 0,
        errors: report.errors,
        details: Vec::new(),
        failures: report.failures,
    };

    for validation in report.details.into_iter().filter(|v| v.mismatch) {
        let player_id = validation.player_id;
        match repair(&store, validation).await {
            Ok(outcome) => {
                result.repaired += 1;
                result.details.push(outcome);
            }
            Err(err) => {
                warn!(%player_id, error = %err, "failed to repair player stats");
                result.errors += 1;
                result.failures.push(PlayerFailure {
                    player_id,
                    message: err.to_string(),
                });
            }
        }
    }

    info!(
        checked = result.checked,
        repaired = result.repaired,
        errors = result.errors,
        "player stats reconciliation finished"
    );
    Ok(result)
}

/// Classify the reconciliation state from a mismatch count.
pub fn classify(total_players: usize, mismatch_count: usize, thresholds: HealthThresholds) -> SeedingHealth {
    let mismatch_percentage = if total_players == 0 {
        0.0
    } else {
        mismatch_count as f64 * 100.0 / total_players as f64
    };

    let status = if mismatch_count == 0 {
        HealthStatus::Healthy
    } else if mismatch_count < thresholds.warning_max_count
        || mismatch_percentage < thresholds.warning_max_percentage
    {
        HealthStatus::Warning
    } else {
        HealthStatus::Error
    };

    SeedingHealth {
        status,
        total_players,
        mismatch_count,
        mismatch_percentage,
    }
}

/// Summarise how far the stored aggregates have drifted from the ledger.
pub async fn health_status(state: &SharedState) -> Result<SeedingHealth, ServiceError> {
    let store = state.require_store().await?;
    let report = validate_players(&store).await?;
    Ok(classify(
        report.total_players,
        report.mismatched,
        state.config().health_thresholds(),
    ))
}

#[cfg(test)]
mod tests {
    use std::time::SystemTime;

    use super::*;
    use crate::{
        config::AppConfig,
        dao::{
            models::{EntryState, MatchEntity, MatchType, ScoringPolicy, TournamentEntity, TournamentStatus},
            seeding_store::{memory::MemorySeedingStore, scripted::ScriptedStore},
        },
        services::seeding_service,
        state::AppState,
    };

    fn entry(tournament_id: Option<Uuid>, match_index: Option<u32>, points: u32, is_winner: bool) -> SeedingPointEntity {
        SeedingPointEntity {
            id: Uuid::new_v4(),
            tournament_id,
            match_index,
            player_id: Uuid::nil(),
            points,
            is_winner,
            state: EntryState::Active,
            reason: None,
            created_at: SystemTime::now(),
        }
    }

    #[test]
    fn expected_stats_counts_each_match_once() {
        let tournament = Some(Uuid::new_v4());
        let mut reversed = entry(tournament, Some(2), 9, true);
        reversed.state = EntryState::Reversed {
            at: SystemTime::now(),
        };
        let entries = vec![
            entry(tournament, Some(0), 5, true),
            entry(tournament, Some(0), 5, true),
            entry(tournament, Some(1), 3, false),
            entry(None, None, 10, false),
            reversed,
        ];

        assert_eq!(
            expected_stats(&entries),
            PlayerStats {
                seed_points: 23,
                matches_won: 1,
                matches_played: 2,
            }
        );
    }

    #[test]
    fn classification_uses_thresholds() {
        let thresholds = HealthThresholds::default();
        assert_eq!(classify(0, 0, thresholds).status, HealthStatus::Healthy);
        assert_eq!(classify(100, 0, thresholds).status, HealthStatus::Healthy);
        assert_eq!(classify(10, 4, thresholds).status, HealthStatus::Warning);
        assert_eq!(classify(1000, 20, thresholds).status, HealthStatus::Warning);
        assert_eq!(classify(10, 5, thresholds).status, HealthStatus::Error);

        let health = classify(8, 2, thresholds);
        assert_eq!(health.mismatch_percentage, 25.0);
    }

    struct Fixture {
        state: SharedState,
        store: MemorySeedingStore,
        players: Vec<Uuid>,
    }

    async fn fixture() -> Fixture {
        let store = MemorySeedingStore::new();
        let state = AppState::with_store(AppConfig::default(), Arc::new(store.clone()));
        let mut players = Vec::new();
        for name in ["Ana", "Ben", "Cleo", "Dev", "Eli"] {
            let player = PlayerEntity::new(name);
            players.push(player.id);
            store.save_player(player).await.unwrap();
        }
        Fixture {
            state,
            store,
            players,
        }
    }

    impl Fixture {
        async fn played_tournament(&self) -> Uuid {
            let game = |score: &str, winner: &str| MatchEntity {
                match_type: MatchType::Doubles,
                team1: vec![self.players[0], self.players[1]],
                team2: vec![self.players[2], self.players[3]],
                score: score.into(),
                winner: winner.into(),
                points_processed: false,
            };
            let tournament = TournamentEntity {
                id: Uuid::new_v4(),
                name: "Spring Ladder".into(),
                date: "2026-04-11".into(),
                status: TournamentStatus::Completed,
                scoring: ScoringPolicy::GamesWon,
                matches: vec![game("6-2", "team1"), game("6-4", "team2")],
                created_at: SystemTime::now(),
                updated_at: SystemTime::now(),
            };
            let id = tournament.id;
            self.store.save_tournament(tournament).await.unwrap();
            seeding_service::process_tournament(&self.state, id)
                .await
                .unwrap();
            id
        }

        fn scripted(&self, scripted: ScriptedStore) -> SharedState {
            AppState::with_store(AppConfig::default(), Arc::new(scripted))
        }

        async fn corrupt(&self, index: usize, stats: PlayerStats) {
            self.store
                .overwrite_player_stats(self.players[index], stats)
                .await
                .unwrap();
        }
    }

    #[tokio::test]
    async fn consistent_ledger_validates_cleanly() {
        let fx = fixture().await;
        fx.played_tournament().await;

        let report = validate_all_players(&fx.state).await.unwrap();

        assert_eq!(report.total_players, 5);
        assert_eq!(report.valid, 5);
        assert_eq!(report.mismatched, 0);
        let health = health_status(&fx.state).await.unwrap();
        assert_eq!(health.status, HealthStatus::Healthy);
    }

    #[tokio::test]
    async fn drift_is_reported_with_signed_difference() {
        let fx = fixture().await;
        fx.played_tournament().await;
        fx.corrupt(
            0,
            PlayerStats {
                seed_points: 20,
                matches_won: 0,
                matches_played: 2,
            },
        )
        .await;

        let validation = validate_player_stats(&fx.state, fx.players[0]).await.unwrap();

        assert!(validation.mismatch);
        assert_eq!(
            validation.expected,
            PlayerStats {
                seed_points: 10,
                matches_won: 1,
                matches_played: 2,
            }
        );
        assert_eq!(
            validation.difference,
            StatsDifference {
                seed_points: -10,
                matches_won: 1,
                matches_played: 0,
            }
        );
    }

    #[tokio::test]
    async fn repairing_a_consistent_player_is_a_no_op() {
        let fx = fixture().await;
        fx.played_tournament().await;

        let result = repair_player_stats(&fx.state, fx.players[1]).await.unwrap();

        assert!(!result.repaired);
        assert_eq!(result.before, result.after);
        assert!(result.delta.is_zero());
    }

    #[tokio::test]
    async fn repair_all_fixes_only_mismatched_players() {
        let fx = fixture().await;
        let tournament_id = fx.played_tournament().await;
        seeding_service::reverse_match(&fx.state, tournament_id, 1)
            .await
            .unwrap();
        fx.corrupt(1, PlayerStats::default()).await;
        fx.corrupt(
            4,
            PlayerStats {
                seed_points: 7,
                matches_won: 1,
                matches_played: 1,
            },
        )
        .await;

        let health = health_status(&fx.state).await.unwrap();
        assert_eq!(health.mismatch_count, 2);
        assert_eq!(health.status, HealthStatus::Warning);

        let result = repair_all_mismatches(&fx.state).await.unwrap();

        assert_eq!(result.checked, 5);
        assert_eq!(result.mismatched, 2);
        assert_eq!(result.repaired, 2);
        assert_eq!(result.errors, 0);
        let repaired: Vec<_> = result.details.iter().map(|r| r.player_id).collect();
        assert!(repaired.contains(&fx.players[1]));
        assert!(repaired.contains(&fx.players[4]));

        let report = validate_all_players(&fx.state).await.unwrap();
        assert_eq!(report.mismatched, 0);
        for detail in &report.details {
            assert!(detail.stored.matches_won <= detail.stored.matches_played);
        }
        let ben = fx.store.find_player(fx.players[1]).await.unwrap().unwrap();
        assert_eq!(
            ben.stats,
            PlayerStats {
                seed_points: 6,
                matches_won: 1,
                matches_played: 1,
            }
        );
    }

    #[tokio::test]
    async fn validation_counts_unreadable_players_and_checks_the_rest() {
        let fx = fixture().await;
        fx.played_tournament().await;
        fx.corrupt(
            4,
            PlayerStats {
                seed_points: 7,
                matches_won: 1,
                matches_played: 1,
            },
        )
        .await;
        let state = fx.scripted(ScriptedStore::new(fx.store.clone()).fail_player_lookup(fx.players[2]));

        let report = validate_all_players(&state).await.unwrap();

        assert_eq!(report.total_players, 5);
        assert_eq!(report.valid, 3);
        assert_eq!(report.mismatched, 1);
        assert_eq!(report.errors, 1);
        assert_eq!(report.details.len(), 4);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].player_id, fx.players[2]);
        assert!(report.details.iter().all(|d| d.player_id != fx.players[2]));
    }

    #[tokio::test]
    async fn repair_all_reports_failed_writes_and_repairs_the_rest() {
        let fx = fixture().await;
        fx.played_tournament().await;
        fx.corrupt(1, PlayerStats::default()).await;
        fx.corrupt(
            4,
            PlayerStats {
                seed_points: 7,
                matches_won: 1,
                matches_played: 1,
            },
        )
        .await;
        let state = fx.scripted(ScriptedStore::new(fx.store.clone()).fail_player_overwrite(fx.players[1]));

        let result = repair_all_mismatches(&state).await.unwrap();

        assert_eq!(result.checked, 5);
        assert_eq!(result.mismatched, 2);
        assert_eq!(result.repaired, 1);
        assert_eq!(result.errors, 1);
        assert_eq!(result.details.len(), 1);
        assert_eq!(result.details[0].player_id, fx.players[4]);
        assert_eq!(result.failures.len(), 1);
        assert_eq!(result.failures[0].player_id, fx.players[1]);

        let ben = fx.store.find_player(fx.players[1]).await.unwrap().unwrap();
        assert_eq!(ben.stats, PlayerStats::default());
        let eli = fx.store.find_player(fx.players[4]).await.unwrap().unwrap();
        assert_eq!(eli.stats, PlayerStats::default());
    }

    #[tokio::test]
    async fn unknown_player_is_not_found() {
        let fx = fixture().await;
        assert!(matches!(
            validate_player_stats(&fx.state, Uuid::new_v4()).await,
            Err(ServiceError::NotFound(_))
        ));
        assert!(matches!(
            repair_player_stats(&fx.state, Uuid::new_v4()).await,
            Err(ServiceError::NotFound(_))
        ));
    }
}
