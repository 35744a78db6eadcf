// End-to-end seasons for each era of the league.

use std::collections::BTreeSet;

use stag_core::format::Season;
use stag_core::model::{
    BracketName, PlacementLabel, PlacementSource, Standing, Team, TeamId, WeeklyResult,
};
use stag_core::ranking::rank_regular_season;
use stag_core::{resolve_season, EngineError, FormatTable, OutcomeStatus, SeasonInput, SeasonOutcome};

// ---------------------------------------------------------------------------
// Fixture
// ---------------------------------------------------------------------------

struct Fixture {
    table: FormatTable,
    season: Season,
    teams: Vec<Team>,
    regular: Vec<WeeklyResult>,
    standing: Standing,
}

/// Circle-method pairing for `n` teams (numbered 1..=n) in `round`.
fn round_robin(n: u32, round: u32) -> Vec<(u32, u32)> {
    let m = n - 1;
    let mut pairs = vec![(n, round % m + 1)];
    for k in 1..n / 2 {
        pairs.push(((round + k) % m + 1, (round + m - k) % m + 1));
    }
    pairs
}

fn regular_score(team: u32, week: u8) -> f64 {
    70.0 + f64::from((team * 37 + u32::from(week) * 53) % 61) + f64::from(team) * 0.01
}

/// A full regular season. Team ids are 101.. so they never equal seeds.
fn fixture(year: u16, n: u32) -> Fixture {
    let table = FormatTable::builtin().unwrap();
    let season = table.resolve(year, n as usize).unwrap();
    let teams: Vec<Team> = (1..=n).map(|i| Team::new(100 + i, format!("Team {i}"))).collect();

    let mut regular = Vec::new();
    for week in 1..=season.regular_weeks {
        for (a, b) in round_robin(n, u32::from(week - 1)) {
            let (ta, tb) = (100 + a, 100 + b);
            let (pa, pb) = (regular_score(ta, week), regular_score(tb, week));
            regular.push(WeeklyResult::game(ta, week, pa, tb, pb));
            regular.push(WeeklyResult::game(tb, week, pb, ta, pa));
        }
    }
    let standing = rank_regular_season(&season, &teams, &regular).unwrap();

    Fixture {
        table,
        season,
        teams,
        regular,
        standing,
    }
}

impl Fixture {
    fn seed(&self, seed: usize) -> TeamId {
        self.standing.team_at(seed).unwrap()
    }

    /// Regular season plus playoff scores for `weeks`, keyed by seed.
    fn input(&self, weeks: std::ops::RangeInclusive<u8>, score: impl Fn(usize, u8) -> f64) -> SeasonInput {
        let mut results = self.regular.clone();
        for week in weeks {
            for seed in 1..=self.season.team_count {
                results.push(WeeklyResult::unopposed(self.seed(seed).0, week, score(seed, week)));
            }
        }
        SeasonInput {
            year: self.season.year,
            teams: self.teams.clone(),
            results,
        }
    }

    fn full(&self, score: impl Fn(usize, u8) -> f64) -> SeasonInput {
        self.input(self.season.playoff_range(), score)
    }

    fn resolve(&self, input: &SeasonInput) -> SeasonOutcome {
        resolve_season(&self.table, input).unwrap()
    }

    fn team_at_rank(&self, outcome: &SeasonOutcome, rank: usize) -> TeamId {
        outcome
            .placements
            .iter()
            .find(|p| p.final_rank == rank)
            .map(|p| p.team_id)
            .unwrap()
    }
}

/// Better seeds always score more.
fn by_seed(seed: usize, _week: u8) -> f64 {
    200.0 - 5.0 * seed as f64
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[test]
fn every_era_yields_a_permutation_of_ranks() {
    for (year, n) in [(2012, 10), (2014, 12), (2017, 12), (2019, 12), (2022, 12)] {
        let fx = fixture(year, n);
        let outcome = fx.resolve(&fx.full(by_seed));
        assert_eq!(outcome.status, OutcomeStatus::Final, "{year}");

        let ranks: Vec<usize> = outcome.placements.iter().map(|p| p.final_rank).collect();
        assert_eq!(ranks, (1..=n as usize).collect::<Vec<_>>(), "{year}");
        let placed: BTreeSet<TeamId> = outcome.placements.iter().map(|p| p.team_id).collect();
        let roster: BTreeSet<TeamId> = fx.teams.iter().map(|t| t.team_id).collect();
        assert_eq!(placed, roster, "{year}");

        let count = |label: PlacementLabel| outcome.placements.iter().filter(|p| p.label == label).count();
        assert_eq!(count(PlacementLabel::Champion), 1, "{year}");
        assert_eq!(count(PlacementLabel::ToiletBowlLoser), 1, "{year}");
        assert_eq!(outcome.champion().map(|p| p.team_id), Some(fx.seed(1)), "{year}");
    }
}

#[test]
fn legacy_2012_contests_decide_ranks() {
    let fx = fixture(2012, 10);
    // Seed 8 wins the mediocre bowl, seed 10 outscores seed 9.
    let outcome = fx.resolve(&fx.full(|seed, week| match seed {
        8 => 250.0,
        10 => 300.0,
        _ => by_seed(seed, week),
    }));

    let at = |rank| outcome.placements.iter().filter(|p| p.final_rank == rank).count();
    assert_eq!(at(1), 1);
    assert_eq!(at(10), 1);

    let fifth = &outcome.placements[4];
    assert_eq!(fifth.team_id, fx.seed(8));
    assert_eq!(fifth.label, PlacementLabel::MediocreBowlWinner);
    assert_eq!(fifth.source, PlacementSource::Cumulative);

    let last = &outcome.placements[9];
    assert_eq!(last.team_id, fx.seed(9));
    assert_eq!(last.label, PlacementLabel::ToiletBowlLoser);
    assert_eq!(last.bracket_name, Some(BracketName::ToiletBowl));
    assert_eq!(fx.team_at_rank(&outcome, 9), fx.seed(10));
}

#[test]
fn legacy_two_team_toilet_bowl_is_cumulative() {
    let fx = fixture(2015, 12);
    let outcome = fx.resolve(&fx.full(|seed, week| if seed == 12 { 180.0 } else { by_seed(seed, week) }));
    assert_eq!(fx.team_at_rank(&outcome, 11), fx.seed(12));
    assert_eq!(fx.team_at_rank(&outcome, 12), fx.seed(11));

    let toilet = outcome.toilet_bowl.as_ref().unwrap();
    assert_eq!(toilet[0].weeks, vec![15, 16]);
    assert!((toilet[0].total - 360.0).abs() < 1e-9);
    assert!(outcome.brackets.ladder.is_none());
}

#[test]
fn modern_mediocre_bowl_is_bragging_rights_only() {
    let fx = fixture(2018, 12);
    let outcome = fx.resolve(&fx.full(|seed, week| match seed {
        7 => 50.0,
        8 => 400.0,
        _ => by_seed(seed, week),
    }));

    assert_eq!(fx.team_at_rank(&outcome, 7), fx.seed(7));
    assert_eq!(fx.team_at_rank(&outcome, 8), fx.seed(8));
    assert_eq!(outcome.placements[7].label, PlacementLabel::MediocreBowlWinner);
    assert_eq!(outcome.placements[6].source, PlacementSource::RegularSeason);

    let bowl = outcome.mediocre_bowl.as_ref().unwrap();
    assert_eq!(bowl[0].team_id, fx.seed(8));
    assert_eq!(bowl[0].weeks, vec![14, 15, 16]);
    assert!((bowl[0].total - 1200.0).abs() < 1e-9);
}

#[test]
fn consolation_ladder_sends_round_one_winners_down() {
    let fx = fixture(2019, 12);
    let outcome = fx.resolve(&fx.full(by_seed));

    // Round 1: 9 beats 12, 10 beats 11. The losers play for 9/10.
    assert_eq!(fx.team_at_rank(&outcome, 9), fx.seed(11));
    assert_eq!(fx.team_at_rank(&outcome, 10), fx.seed(12));
    assert_eq!(fx.team_at_rank(&outcome, 11), fx.seed(9));
    assert_eq!(fx.team_at_rank(&outcome, 12), fx.seed(10));
    assert_eq!(outcome.placements[11].label, PlacementLabel::ToiletBowlLoser);
    assert_eq!(outcome.placements[11].round_eliminated, Some(2));
}

#[test]
fn six_team_ladder_in_2017() {
    let fx = fixture(2017, 12);
    let outcome = fx.resolve(&fx.full(by_seed));
    let ladder = outcome.brackets.ladder.as_ref().unwrap();
    assert_eq!(ladder.rounds, 3);
    assert!(ladder.is_complete());
    assert!(outcome.mediocre_bowl.is_none());

    assert_eq!(fx.team_at_rank(&outcome, 7), fx.seed(11));
    assert_eq!(fx.team_at_rank(&outcome, 12), fx.seed(10));
}

#[test]
fn winners_bracket_upsets_carry_through() {
    let fx = fixture(2021, 12);
    // Seed 6 scores big every playoff week.
    let outcome = fx.resolve(&fx.full(|seed, week| if seed == 6 { 500.0 } else { by_seed(seed, week) }));
    assert_eq!(outcome.season.final_week(), 17);
    assert_eq!(fx.team_at_rank(&outcome, 1), fx.seed(6));
    assert_eq!(fx.team_at_rank(&outcome, 2), fx.seed(1));
    assert_eq!(outcome.placements[1].round_eliminated, Some(3));
    assert_eq!(outcome.placements[1].bracket_name, Some(BracketName::Winners));
}

#[test]
fn reruns_are_byte_identical() {
    let fx = fixture(2019, 12);
    let input = fx.full(by_seed);
    let first = serde_json::to_string(&fx.resolve(&input)).unwrap();
    let second = serde_json::to_string(&fx.resolve(&input)).unwrap();
    assert_eq!(first, second);

    let mut shuffled = input.clone();
    shuffled.results.reverse();
    shuffled.teams.reverse();
    let third = serde_json::to_string(&fx.resolve(&shuffled)).unwrap();
    assert_eq!(first, third);
}

#[test]
fn partial_playoffs_are_provisional() {
    let fx = fixture(2019, 12);

    let outcome = fx.resolve(&fx.input(14..=14, by_seed));
    assert_eq!(outcome.status, OutcomeStatus::Provisional);
    assert_eq!(outcome.brackets.winners.resolved_rounds(), 1);
    assert_eq!(outcome.brackets.ladder.as_ref().unwrap().resolved_rounds(), 0);
    assert!(outcome.champion().is_none());
    for p in &outcome.placements {
        assert_eq!(Some(p.final_rank), fx.standing.rank_of(p.team_id));
        assert_eq!(p.source, PlacementSource::RegularSeason);
    }

    let outcome = fx.resolve(&fx.input(14..=15, by_seed));
    assert_eq!(outcome.status, OutcomeStatus::Provisional);
    assert_eq!(outcome.brackets.winners.resolved_rounds(), 2);
    assert_eq!(outcome.brackets.ladder.as_ref().unwrap().resolved_rounds(), 1);
}

#[test]
fn regular_season_only_yields_the_standing() {
    let fx = fixture(2020, 12);
    let outcome = fx.resolve(&fx.input(14..=13, by_seed));
    assert_eq!(outcome.status, OutcomeStatus::Standing);
    assert_eq!(outcome.standing, fx.standing);
    assert!(outcome.placements.iter().all(|p| p.bracket_name.is_none() && p.round_eliminated.is_none()));
    // Nobody has won anything yet.
    assert!(outcome.placements.iter().all(|p| p.label == PlacementLabel::Place(p.final_rank)));
    assert!(outcome.champion().is_none());
}

#[test]
fn playoffs_without_the_last_regular_week_are_incomplete() {
    let fx = fixture(2019, 12);
    let mut input = fx.full(by_seed);
    input.results.retain(|r| r.week != 13);

    let err = resolve_season(&fx.table, &input).unwrap_err();
    assert!(matches!(err, EngineError::IncompleteData { week: 13, .. }), "{err}");
    assert!(err.is_recoverable());

    // A gap earlier in the season is named as well.
    let mut input = fx.full(by_seed);
    input.results.retain(|r| r.week != 4 && r.week != 9);
    assert!(matches!(
        resolve_season(&fx.table, &input),
        Err(EngineError::IncompleteData { week: 4, .. })
    ));
}

#[test]
fn missing_playoff_score_is_recoverable() {
    let fx = fixture(2019, 12);
    let mut input = fx.full(by_seed);
    let top = fx.seed(1);
    input.results.retain(|r| !(r.team_id == top && r.week == 15));

    let err = resolve_season(&fx.table, &input).unwrap_err();
    match &err {
        EngineError::IncompletePropagation { bracket, round, reason } => {
            assert_eq!(*bracket, BracketName::Winners);
            assert_eq!(*round, 2);
            assert!(reason.contains("week 15"), "{reason}");
        }
        other => panic!("expected IncompletePropagation, got: {other}"),
    }
    assert!(err.is_recoverable());
}

#[test]
fn ten_team_league_in_a_twelve_team_era_is_unsupported() {
    let fx = fixture(2012, 10);
    let mut input = fx.full(by_seed);
    input.year = 2019;
    assert!(matches!(
        resolve_season(&fx.table, &input),
        Err(EngineError::UnsupportedFormat { year: 2019, team_count: 10 })
    ));
}
