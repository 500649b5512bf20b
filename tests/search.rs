/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use std::{
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Arc,
    },
    thread,
    time::Duration,
};

use corvid::{
    HistoryTable, LogNone, Position, Score, Search, SearchConfig, SearchResult, TTable,
    Tablebase, TablebaseEntry, Wdl, FEN_KIWIPETE,
};

fn search(fen: &str, config: SearchConfig) -> SearchResult {
    let mut position = Position::from_fen(fen).unwrap();
    let mut ttable = TTable::new(1);
    let mut history = HistoryTable::default();

    Search::<LogNone>::new(Arc::new(AtomicBool::new(true)), config, &mut ttable, &mut history)
        .start(&mut position)
        .unwrap()
}

fn is_legal_root_move(fen: &str, result: &SearchResult) -> bool {
    let position = Position::from_fen(fen).unwrap();
    result
        .bestmove
        .is_some_and(|mv| position.legal_moves().contains(&mv))
}

#[test]
fn back_rank_mate_is_found() {
    let fen = "6k1/5ppp/8/8/8/8/5PPP/3R2K1 w - - 0 1";
    let config = SearchConfig {
        max_depth: 3,
        ..Default::default()
    };

    let res = search(fen, config);
    assert_eq!(res.bestmove.unwrap().to_string(), "d1d8");
    assert!(res.score.is_mate());
    assert_eq!(res.score.moves_to_mate(), 1);
}

#[test]
fn node_limit_still_completes_depth_one() {
    let config = SearchConfig {
        max_nodes: 1,
        ..Default::default()
    };

    let res = search(FEN_KIWIPETE, config);
    assert!(is_legal_root_move(FEN_KIWIPETE, &res));
    assert_eq!(res.depth, 1);
}

#[test]
fn stop_flag_cancels_an_infinite_search() {
    let is_searching = Arc::new(AtomicBool::new(true));
    let flag = Arc::clone(&is_searching);

    let handle = thread::spawn(move || {
        let mut position = Position::from_fen(FEN_KIWIPETE).unwrap();
        let mut ttable = TTable::new(1);
        let mut history = HistoryTable::default();
        Search::<LogNone>::new(flag, SearchConfig::default(), &mut ttable, &mut history)
            .start(&mut position)
            .unwrap()
    });

    thread::sleep(Duration::from_millis(50));
    is_searching.store(false, Ordering::Relaxed);

    let res = handle.join().unwrap();
    assert!(is_legal_root_move(FEN_KIWIPETE, &res));
    assert!(res.depth >= 1);
    assert_eq!(res.pv.first(), res.bestmove);
}

#[test]
fn zero_prune_chance_is_deterministic() {
    let config = SearchConfig {
        max_depth: 4,
        ..Default::default()
    };

    let first = search(FEN_KIWIPETE, config);
    let second = search(FEN_KIWIPETE, config);
    assert_eq!(first, second);
}

#[test]
fn seeded_weakening_is_reproducible() {
    let config = SearchConfig {
        max_depth: 4,
        prune_chance: 50,
        randomize: true,
        seed: Some(0xC0FFEE),
        ..Default::default()
    };

    let first = search(FEN_KIWIPETE, config);
    let second = search(FEN_KIWIPETE, config);
    assert!(is_legal_root_move(FEN_KIWIPETE, &first));
    assert_eq!(first.bestmove, second.bestmove);
    assert_eq!(first.nodes, second.nodes);
}

#[test]
fn always_overlooking_refutations_still_plays_legal_moves() {
    let config = SearchConfig {
        max_depth: 3,
        prune_chance: 100,
        seed: Some(7),
        ..Default::default()
    };

    let res = search(FEN_KIWIPETE, config);
    assert!(is_legal_root_move(FEN_KIWIPETE, &res));
}

/// Claims every position with few pieces is drawn, answering with the first legal move.
#[derive(Default)]
struct DrawishTablebase {
    probes: AtomicUsize,
}

impl Tablebase for DrawishTablebase {
    fn probe(&self, position: &Position) -> Option<TablebaseEntry> {
        self.probes.fetch_add(1, Ordering::Relaxed);
        Some(TablebaseEntry {
            bestmove: position.legal_moves().first().copied(),
            result: Wdl::Draw,
        })
    }

    fn max_pieces(&self) -> u8 {
        3
    }
}

#[test]
fn tablebase_answers_at_the_root() {
    let fen = "4k3/8/8/8/8/8/3Q4/4K3 w - - 0 1";
    let tablebase = DrawishTablebase::default();
    let mut position = Position::from_fen(fen).unwrap();
    let expected = position.legal_moves().first().copied();

    let mut ttable = TTable::new(1);
    let mut history = HistoryTable::default();
    let config = SearchConfig {
        max_depth: 5,
        egtb: true,
        ..Default::default()
    };

    let res = Search::<LogNone>::new(Arc::new(AtomicBool::new(true)), config, &mut ttable, &mut history)
        .with_tablebase(&tablebase)
        .start(&mut position)
        .unwrap();

    assert_eq!(res.bestmove, expected);
    assert_eq!(res.score, Score::DRAW);
    assert_eq!(res.nodes, 1);
    assert_eq!(tablebase.probes.load(Ordering::Relaxed), 1);
}

#[test]
fn tablebase_is_ignored_when_disabled() {
    let fen = "4k3/8/8/8/8/8/3Q4/4K3 w - - 0 1";
    let tablebase = DrawishTablebase::default();
    let mut position = Position::from_fen(fen).unwrap();

    let mut ttable = TTable::new(1);
    let mut history = HistoryTable::default();
    let config = SearchConfig {
        max_depth: 3,
        ..Default::default()
    };

    let res = Search::<LogNone>::new(Arc::new(AtomicBool::new(true)), config, &mut ttable, &mut history)
        .with_tablebase(&tablebase)
        .start(&mut position)
        .unwrap();

    assert!(res.score > Score::DRAW);
    assert_eq!(tablebase.probes.load(Ordering::Relaxed), 0);
}

#[test]
fn search_leaves_the_position_untouched() {
    let mut position = Position::from_fen(FEN_KIWIPETE).unwrap();
    let key = position.key();

    let mut ttable = TTable::new(1);
    let mut history = HistoryTable::default();
    let config = SearchConfig {
        max_depth: 4,
        ..Default::default()
    };

    Search::<LogNone>::new(Arc::new(AtomicBool::new(true)), config, &mut ttable, &mut history)
        .start(&mut position)
        .unwrap();

    assert_eq!(position.key(), key);
    assert_eq!(position.to_fen(), FEN_KIWIPETE);
    assert!(position.validate().is_ok());
}
