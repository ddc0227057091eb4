//! Seeding engine: awards ledger points for match results, keeps player aggregates in
//! step, and reverses awards when a match is edited or its tournament removed.
//!
//! Idempotency rests on the ledger key (tournament, match index, player): a second
//! award for a key that already has an active entry is rejected by the store and
//! counted as a duplicate, so retrying a half-processed match never double counts.

use std::{sync::Arc, time::SystemTime};

use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    dao::{
        models::{EntryState, SeedingPointEntity, TournamentEntity},
        seeding_store::SeedingStore,
        storage::StorageError,
    },
    dto::seeding::{
        LedgerEntrySummary, ManualAdjustmentRequest, MatchFailure, MatchProcessReport,
        MatchReverseReport, SkippedParticipant, TournamentProcessReport, TournamentReverseReport,
    },
    error::ServiceError,
    services::scoring::{MatchOutcome, ScoringRule, Side},
    state::SharedState,
};

async fn load_tournament(
    store: &Arc<dyn SeedingStore>,
    tournament_id: Uuid,
) -> Result<TournamentEntity, ServiceError> {
    store
        .find_tournament(tournament_id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("tournament `{tournament_id}` not found")))
}

fn ensure_match_index(tournament: &TournamentEntity, match_index: u32) -> Result<(), ServiceError> {
    if (match_index as usize) < tournament.matches.len() {
        Ok(())
    } else {
        Err(ServiceError::NotFound(format!(
            "match #{match_index} not found in tournament `{}`",
            tournament.id
        )))
    }
}

/// Award points for one match of a tournament.
///
/// Fails with [`ServiceError::AlreadyProcessed`] when the match is flagged as processed.
/// Unknown players are reported in [`MatchProcessReport::skipped`] and keep the match
/// eligible for a retry.
pub async fn process_match(
    state: &SharedState,
    tournament_id: Uuid,
    match_index: u32,
) -> Result<MatchProcessReport, ServiceError> {
    let store = state.require_store().await?;
    let tournament = load_tournament(&store, tournament_id).await?;
    ensure_match_index(&tournament, match_index)?;
    award_match(&store, &tournament, match_index).await
}

async fn award_match(
    store: &Arc<dyn SeedingStore>,
    tournament: &TournamentEntity,
    match_index: u32,
) -> Result<MatchProcessReport, ServiceError> {
    let game = &tournament.matches[match_index as usize];
    if game.points_processed {
        return Err(ServiceError::AlreadyProcessed {
            tournament_id: tournament.id,
            match_index,
        });
    }

    let outcome =
        MatchOutcome::from_match(game).map_err(|err| ServiceError::InvalidInput(err.to_string()))?;
    let points = tournament.scoring.side_points(&outcome);
    let now = SystemTime::now();

    let sides = game
        .team1
        .iter()
        .map(|id| (Side::Team1, *id))
        .chain(game.team2.iter().map(|id| (Side::Team2, *id)));

    let mut report = MatchProcessReport::new(tournament.id, match_index);
    for (side, player_id) in sides {
        if store.find_player(player_id).await?.is_none() {
            warn!(
                tournament_id = %tournament.id,
                match_index,
                %player_id,
                "participant does not resolve to a player; skipping"
            );
            report.skipped.push(SkippedParticipant {
                player_id,
                reason: "player not found".into(),
            });
            continue;
        }

        let entry = SeedingPointEntity {
            id: Uuid::new_v4(),
            tournament_id: Some(tournament.id),
            match_index: Some(match_index),
            player_id,
            points: points.for_side(&outcome, side),
            is_winner: outcome.is_winner(side),
            state: EntryState::Active,
            reason: None,
            created_at: now,
        };
        let awarded_points = entry.points;

        match store.award_entry(entry).await {
            Ok(()) => {
                report.awarded += 1;
                debug!(
                    tournament_id = %tournament.id,
                    match_index,
                    %player_id,
                    points = awarded_points,
                    "seeding points awarded"
                );
            }
            Err(StorageError::Duplicate { key }) => {
                report.duplicates += 1;
                debug!(%key, "active ledger entry already present; skipping");
            }
            Err(StorageError::Missing { id, .. }) => {
                warn!(
                    tournament_id = %tournament.id,
                    match_index,
                    player_id = %id,
                    "player disappeared before the award could be recorded"
                );
                report.skipped.push(SkippedParticipant {
                    player_id: id,
                    reason: "player not found".into(),
                });
            }
            Err(err) => return Err(err.into()),
        }
    }

    if report.skipped.is_empty() {
        report.processed = store
            .set_points_processed(tournament.id, match_index, true)
            .await?;
        if !report.processed {
            warn!(
                tournament_id = %tournament.id,
                match_index,
                "tournament changed while awarding points; match not flagged"
            );
        }
    } else {
        warn!(
            tournament_id = %tournament.id,
            match_index,
            skipped = report.skipped.len(),
            "match left unprocessed for retry"
        );
    }

    info!(
        tournament_id = %tournament.id,
        match_index,
        awarded = report.awarded,
        duplicates = report.duplicates,
        processed = report.processed,
        "match processed"
    );
    Ok(report)
}

/// Reverse every active ledger entry of a match and clear its processed flag.
///
/// Calling it on a match without active entries is a no-op that still resets the flag.
pub async fn reverse_match(
    state: &SharedState,
    tournament_id: Uuid,
    match_index: u32,
) -> Result<MatchReverseReport, ServiceError> {
    let store = state.require_store().await?;
    let tournament = load_tournament(&store, tournament_id).await?;
    ensure_match_index(&tournament, match_index)?;
    let reversed = reverse_match_entries(&store, tournament_id, match_index).await?;
    Ok(MatchReverseReport {
        tournament_id,
        match_index,
        reversed,
    })
}

pub(crate) async fn reverse_match_entries(
    store: &Arc<dyn SeedingStore>,
    tournament_id: Uuid,
    match_index: u32,
) -> Result<usize, ServiceError> {
    let entries = store
        .active_entries_for_match(tournament_id, match_index)
        .await?;
    let at = SystemTime::now();

    let mut reversed = 0;
    for entry in entries {
        if let Some(before) = store.reverse_entry(entry.id, at).await? {
            reversed += 1;
            debug!(
                %tournament_id,
                match_index,
                player_id = %before.player_id,
                points = before.points,
                "seeding points reversed"
            );
        }
    }

    store
        .set_points_processed(tournament_id, match_index, false)
        .await?;

    if reversed > 0 {
        info!(%tournament_id, match_index, reversed, "match reversed");
    }
    Ok(reversed)
}

/// Reverse every match of a tournament, continuing past individual failures.
pub async fn reverse_tournament(
    state: &SharedState,
    tournament_id: Uuid,
) -> Result<TournamentReverseReport, ServiceError> {
    let store = state.require_store().await?;
    let tournament = load_tournament(&store, tournament_id).await?;
    Ok(reverse_all_matches(&store, &tournament).await)
}

pub(crate) async fn reverse_all_matches(
    store: &Arc<dyn SeedingStore>,
    tournament: &TournamentEntity,
) -> TournamentReverseReport {
    let mut report = TournamentReverseReport {
        tournament_id: tournament.id,
        matches: tournament.matches.len(),
        reversed: 0,
        errors: 0,
        failures: Vec::new(),
    };

    for match_index in 0..tournament.matches.len() as u32 {
        match reverse_match_entries(store, tournament.id, match_index).await {
            Ok(count) => report.reversed += count,
            Err(err) => {
                warn!(
                    tournament_id = %tournament.id,
                    match_index,
                    error = %err,
                    "failed to reverse match"
                );
                report.errors += 1;
                report.failures.push(MatchFailure {
                    match_index,
                    message: err.to_string(),
                });
            }
        }
    }

    info!(
        tournament_id = %tournament.id,
        reversed = report.reversed,
        errors = report.errors,
        "tournament reversed"
    );
    report
}

/// Award points for every match of a tournament that is not processed yet.
pub async fn process_tournament(
    state: &SharedState,
    tournament_id: Uuid,
) -> Result<TournamentProcessReport, ServiceError> {
    let store = state.require_store().await?;
    let tournament = load_tournament(&store, tournament_id).await?;

    let mut report = TournamentProcessReport {
        tournament_id,
        processed: 0,
        already_processed: 0,
        errors: 0,
        matches: Vec::new(),
        failures: Vec::new(),
    };

    for (index, game) in tournament.matches.iter().enumerate() {
        let match_index = index as u32;
        if game.points_processed {
            report.already_processed += 1;
            continue;
        }

        match award_match(&store, &tournament, match_index).await {
            Ok(outcome) => {
                if outcome.processed {
                    report.processed += 1;
                } else {
                    report.errors += 1;
                }
                report.matches.push(outcome);
            }
            Err(err) => {
                warn!(%tournament_id, match_index, error = %err, "failed to process match");
                report.errors += 1;
                report.failures.push(MatchFailure {
                    match_index,
                    message: err.to_string(),
                });
            }
        }
    }

    info!(
        %tournament_id,
        processed = report.processed,
        errors = report.errors,
        "tournament processed"
    );
    Ok(report)
}

/// Credit a player with seed points outside of any tournament.
pub async fn award_manual_points(
    state: &SharedState,
    player_id: Uuid,
    request: ManualAdjustmentRequest,
) -> Result<LedgerEntrySummary, ServiceError> {
    let store = state.require_store().await?;
    if store.find_player(player_id).await?.is_none() {
        return Err(ServiceError::NotFound(format!("player `{player_id}` not found")));
    }

    let entry = SeedingPointEntity {
        id: Uuid::new_v4(),
        tournament_id: None,
        match_index: None,
        player_id,
        points: request.points,
        is_winner: false,
        state: EntryState::Active,
        reason: Some(request.reason),
        created_at: SystemTime::now(),
    };
    store.award_entry(entry.clone()).await?;
    info!(%player_id, points = entry.points, "manual seed points awarded");
    Ok(entry.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::AppConfig,
        dao::{
            models::{MatchEntity, MatchType, PlayerEntity, PlayerStats, ScoringPolicy, TournamentStatus},
            seeding_store::{memory::MemorySeedingStore, scripted::ScriptedStore},
        },
        state::AppState,
    };

    const FIXED: ScoringPolicy = ScoringPolicy::Fixed {
        winner_points: 5,
        loser_points: 3,
    };

    struct Fixture {
        state: SharedState,
        store: MemorySeedingStore,
        players: Vec<Uuid>,
    }

    async fn fixture() -> Fixture {
        let store = MemorySeedingStore::new();
        let state = AppState::with_store(AppConfig::default(), Arc::new(store.clone()));
        let mut players = Vec::new();
        for name in ["Ana", "Ben", "Cleo", "Dev"] {
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
        fn doubles(&self, score: &str, winner: &str) -> MatchEntity {
            MatchEntity {
                match_type: MatchType::Doubles,
                team1: vec![self.players[0], self.players[1]],
                team2: vec![self.players[2], self.players[3]],
                score: score.into(),
                winner: winner.into(),
                points_processed: false,
            }
        }

        async fn tournament(&self, scoring: ScoringPolicy, matches: Vec<MatchEntity>) -> Uuid {
            let tournament = TournamentEntity {
                id: Uuid::new_v4(),
                name: "Club Open".into(),
                date: "2026-05-02".into(),
                status: TournamentStatus::Completed,
                scoring,
                matches,
                created_at: SystemTime::now(),
                updated_at: SystemTime::now(),
            };
            let id = tournament.id;
            self.store.save_tournament(tournament).await.unwrap();
            id
        }

        async fn stats(&self, index: usize) -> PlayerStats {
            self.store
                .find_player(self.players[index])
                .await
                .unwrap()
                .unwrap()
                .stats
        }

        async fn flag(&self, tournament_id: Uuid, match_index: usize) -> bool {
            self.store
                .find_tournament(tournament_id)
                .await
                .unwrap()
                .unwrap()
                .matches[match_index]
                .points_processed
        }
    }

    fn stats(seed_points: u32, matches_won: u32, matches_played: u32) -> PlayerStats {
        PlayerStats {
            seed_points,
            matches_won,
            matches_played,
        }
    }

    #[tokio::test]
    async fn fixed_policy_awards_winner_and_loser_amounts() {
        let fx = fixture().await;
        let id = fx.tournament(FIXED, vec![fx.doubles("4-0", "team1")]).await;

        let report = process_match(&fx.state, id, 0).await.unwrap();

        assert_eq!(report.awarded, 4);
        assert!(report.processed);
        assert!(fx.flag(id, 0).await);
        for winner in 0..2 {
            assert_eq!(fx.stats(winner).await, stats(5, 1, 1));
        }
        for loser in 2..4 {
            assert_eq!(fx.stats(loser).await, stats(3, 0, 1));
        }
    }

    #[tokio::test]
    async fn processed_flag_blocks_a_second_call() {
        let fx = fixture().await;
        let id = fx.tournament(FIXED, vec![fx.doubles("4-0", "team1")]).await;
        process_match(&fx.state, id, 0).await.unwrap();

        let err = process_match(&fx.state, id, 0).await.unwrap_err();

        assert!(matches!(
            err,
            ServiceError::AlreadyProcessed { match_index: 0, .. }
        ));
        assert_eq!(fx.store.all_entries().await.len(), 4);
        assert_eq!(fx.stats(0).await, stats(5, 1, 1));
    }

    #[tokio::test]
    async fn reprocessing_with_active_entries_awards_nothing() {
        let fx = fixture().await;
        let id = fx.tournament(FIXED, vec![fx.doubles("4-0", "team1")]).await;
        process_match(&fx.state, id, 0).await.unwrap();
        // Simulate a crash between the awards and the flag update.
        fx.store.set_points_processed(id, 0, false).await.unwrap();

        let report = process_match(&fx.state, id, 0).await.unwrap();

        assert_eq!(report.awarded, 0);
        assert_eq!(report.duplicates, 4);
        assert!(report.processed);
        assert_eq!(fx.store.all_entries().await.len(), 4);
        assert_eq!(fx.stats(0).await, stats(5, 1, 1));
        assert_eq!(fx.stats(3).await, stats(3, 0, 1));
    }

    #[tokio::test]
    async fn games_won_policy_follows_the_score() {
        let fx = fixture().await;
        let id = fx
            .tournament(ScoringPolicy::GamesWon, vec![fx.doubles("4-3", "team2")])
            .await;

        process_match(&fx.state, id, 0).await.unwrap();

        assert_eq!(fx.stats(2).await, stats(4, 1, 1));
        assert_eq!(fx.stats(3).await, stats(4, 1, 1));
        assert_eq!(fx.stats(0).await, stats(3, 0, 1));
        assert_eq!(fx.stats(1).await, stats(3, 0, 1));
    }

    #[tokio::test]
    async fn games_won_shutout_still_counts_as_played() {
        let fx = fixture().await;
        let id = fx
            .tournament(ScoringPolicy::GamesWon, vec![fx.doubles("4-0", "team1")])
            .await;

        let report = process_match(&fx.state, id, 0).await.unwrap();

        assert_eq!(report.awarded, 4);
        assert_eq!(fx.stats(0).await, stats(4, 1, 1));
        assert_eq!(fx.stats(2).await, stats(0, 0, 1));
        assert_eq!(fx.stats(3).await, stats(0, 0, 1));
    }

    #[tokio::test]
    async fn unknown_participant_leaves_match_unprocessed() {
        let fx = fixture().await;
        let mut game = fx.doubles("6-4", "team1");
        let ghost = Uuid::new_v4();
        game.team2[1] = ghost;
        let id = fx.tournament(FIXED, vec![game]).await;

        let report = process_match(&fx.state, id, 0).await.unwrap();

        assert_eq!(report.awarded, 3);
        assert_eq!(
            report.skipped,
            vec![SkippedParticipant {
                player_id: ghost,
                reason: "player not found".into()
            }]
        );
        assert!(!report.processed);
        assert!(!fx.flag(id, 0).await);

        // Once the roster is fixed, a retry only awards the missing participant.
        let mut late = PlayerEntity::new("Eve");
        late.id = ghost;
        fx.store.save_player(late).await.unwrap();
        let retry = process_match(&fx.state, id, 0).await.unwrap();
        assert_eq!(retry.awarded, 1);
        assert_eq!(retry.duplicates, 3);
        assert!(retry.processed);
        assert_eq!(fx.stats(0).await, stats(5, 1, 1));
    }

    #[tokio::test]
    async fn invalid_score_is_rejected_before_any_award() {
        let fx = fixture().await;
        let id = fx.tournament(FIXED, vec![fx.doubles("four-zero", "team1")]).await;

        let err = process_match(&fx.state, id, 0).await.unwrap_err();

        assert!(matches!(err, ServiceError::InvalidInput(_)));
        assert!(fx.store.all_entries().await.is_empty());
    }

    #[tokio::test]
    async fn unknown_tournament_or_match_is_not_found() {
        let fx = fixture().await;
        let id = fx.tournament(FIXED, vec![fx.doubles("6-4", "team1")]).await;

        assert!(matches!(
            process_match(&fx.state, Uuid::new_v4(), 0).await,
            Err(ServiceError::NotFound(_))
        ));
        assert!(matches!(
            process_match(&fx.state, id, 1).await,
            Err(ServiceError::NotFound(_))
        ));
        assert!(matches!(
            reverse_match(&fx.state, id, 7).await,
            Err(ServiceError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn award_then_reverse_restores_previous_stats() {
        let fx = fixture().await;
        let warmup = fx.tournament(FIXED, vec![fx.doubles("6-1", "team2")]).await;
        process_match(&fx.state, warmup, 0).await.unwrap();
        let before: Vec<_> = futures::future::join_all((0..4).map(|i| fx.stats(i))).await;

        let id = fx
            .tournament(ScoringPolicy::GamesWon, vec![fx.doubles("6-3", "team1")])
            .await;
        process_match(&fx.state, id, 0).await.unwrap();
        let report = reverse_match(&fx.state, id, 0).await.unwrap();

        assert_eq!(report.reversed, 4);
        assert!(!fx.flag(id, 0).await);
        let after: Vec<_> = futures::future::join_all((0..4).map(|i| fx.stats(i))).await;
        assert_eq!(before, after);

        let entries = fx.store.all_entries().await;
        assert_eq!(entries.len(), 8);
        assert_eq!(entries.iter().filter(|e| !e.state.is_active()).count(), 4);
    }

    #[tokio::test]
    async fn reversing_twice_is_a_no_op() {
        let fx = fixture().await;
        let id = fx.tournament(FIXED, vec![fx.doubles("6-4", "team1")]).await;
        process_match(&fx.state, id, 0).await.unwrap();

        assert_eq!(reverse_match(&fx.state, id, 0).await.unwrap().reversed, 4);
        assert_eq!(reverse_match(&fx.state, id, 0).await.unwrap().reversed, 0);
        assert_eq!(fx.stats(0).await, PlayerStats::default());
    }

    #[tokio::test]
    async fn at_most_one_active_entry_per_key() {
        let fx = fixture().await;
        let id = fx.tournament(FIXED, vec![fx.doubles("6-4", "team1")]).await;
        for _ in 0..3 {
            process_match(&fx.state, id, 0).await.unwrap();
            reverse_match(&fx.state, id, 0).await.unwrap();
        }
        process_match(&fx.state, id, 0).await.unwrap();

        let entries = fx.store.all_entries().await;
        for player in &fx.players {
            let active = entries
                .iter()
                .filter(|e| e.player_id == *player && e.state.is_active())
                .count();
            assert_eq!(active, 1);
        }
        for index in 0..4 {
            let stats = fx.stats(index).await;
            assert!(stats.matches_won <= stats.matches_played);
        }
    }

    #[tokio::test]
    async fn process_tournament_counts_processed_and_errors() {
        let fx = fixture().await;
        let mut broken = fx.doubles("6-4", "team1");
        broken.team1[0] = Uuid::new_v4();
        let id = fx
            .tournament(
                FIXED,
                vec![
                    fx.doubles("6-4", "team1"),
                    broken,
                    fx.doubles("bad", "team1"),
                    fx.doubles("6-0", "team2"),
                ],
            )
            .await;
        process_match(&fx.state, id, 3).await.unwrap();

        let report = process_tournament(&fx.state, id).await.unwrap();

        assert_eq!(report.processed, 1);
        assert_eq!(report.already_processed, 1);
        assert_eq!(report.errors, 2);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].match_index, 2);
    }

    #[tokio::test]
    async fn reverse_tournament_restores_every_player() {
        let fx = fixture().await;
        let id = fx
            .tournament(
                FIXED,
                vec![fx.doubles("6-4", "team1"), fx.doubles("3-6", "team2")],
            )
            .await;
        process_tournament(&fx.state, id).await.unwrap();
        assert_eq!(fx.stats(0).await, stats(8, 1, 2));

        let report = reverse_tournament(&fx.state, id).await.unwrap();

        assert_eq!(report.matches, 2);
        assert_eq!(report.reversed, 8);
        assert_eq!(report.errors, 0);
        for index in 0..4 {
            assert_eq!(fx.stats(index).await, PlayerStats::default());
        }
    }

    #[tokio::test]
    async fn reverse_tournament_reports_failed_match_and_continues() {
        let fx = fixture().await;
        let id = fx
            .tournament(
                FIXED,
                vec![
                    fx.doubles("6-4", "team1"),
                    fx.doubles("3-6", "team2"),
                    fx.doubles("6-1", "team1"),
                ],
            )
            .await;
        process_tournament(&fx.state, id).await.unwrap();
        let state = AppState::with_store(
            AppConfig::default(),
            Arc::new(ScriptedStore::new(fx.store.clone()).fail_match_lookup(1)),
        );

        let report = reverse_tournament(&state, id).await.unwrap();

        assert_eq!(report.matches, 3);
        assert_eq!(report.reversed, 8);
        assert_eq!(report.errors, 1);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].match_index, 1);
        assert_eq!(report.failures[0].message, "storage unavailable");

        assert!(!fx.flag(id, 0).await);
        assert!(fx.flag(id, 1).await);
        assert!(!fx.flag(id, 2).await);
        assert_eq!(fx.store.active_entries_for_match(id, 1).await.unwrap().len(), 4);
        assert_eq!(fx.stats(0).await, stats(3, 0, 1));
        assert_eq!(fx.stats(2).await, stats(5, 1, 1));
    }

    #[tokio::test]
    async fn manual_points_add_to_seed_points_only() {
        let fx = fixture().await;
        let summary = award_manual_points(
            &fx.state,
            fx.players[0],
            ManualAdjustmentRequest {
                points: 10,
                reason: "league bonus".into(),
            },
        )
        .await
        .unwrap();

        assert!(summary.active);
        assert_eq!(summary.tournament_id, None);
        assert_eq!(fx.stats(0).await, stats(10, 0, 0));

        let missing = award_manual_points(
            &fx.state,
            Uuid::new_v4(),
            ManualAdjustmentRequest {
                points: 1,
                reason: "typo".into(),
            },
        )
        .await;
        assert!(matches!(missing, Err(ServiceError::NotFound(_))));
    }

    #[tokio::test]
    async fn degraded_state_rejects_processing() {
        let state = AppState::new(AppConfig::default());
        assert!(matches!(
            process_match(&state, Uuid::new_v4(), 0).await,
            Err(ServiceError::Degraded)
        ));
    }
}
