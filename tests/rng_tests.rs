//! RNG tests for card-table-engine
//!
//! Эти тесты проверяют:
//! - детерминированность DeterministicRng
//! - различие seed → различие перемешивания
//! - что shuffle не теряет и не дублирует карты колоды
//! - вывод seed стола из master seed
//! - pick_index / chance в допустимых границах

use card_table_engine::domain::{Card, Deck};
use card_table_engine::infra::{DeterministicRng, RandomSource, RngSeed, SystemRng};
use card_table_engine::rules::four_color::{self, FourColorCard};
use card_table_engine::rules::RuleLogic;

//
// TEST 1: одинаковый seed, одинаковое перемешивание
//
#[test]
fn deterministic_rng_same_seed_same_shuffle() {
    let mut r1 = DeterministicRng::from_u64(123);
    let mut r2 = DeterministicRng::from_u64(123);

    let mut a: Vec<u32> = (0..117).collect();
    let mut b: Vec<u32> = (0..117).collect();
    r1.shuffle(&mut a);
    r2.shuffle(&mut b);

    assert_eq!(a, b, "одинаковый seed должен давать одинаковый порядок");
}

//
// TEST 2: разные seed, разный порядок
//
#[test]
fn deterministic_rng_different_seed_different_shuffle() {
    let mut r1 = DeterministicRng::from_u64(1);
    let mut r2 = DeterministicRng::from_u64(2);

    let mut a: Vec<u32> = (0..117).collect();
    let mut b: Vec<u32> = (0..117).collect();
    r1.shuffle(&mut a);
    r2.shuffle(&mut b);

    assert_ne!(a, b);
}

//
// TEST 3: после shuffle в колоде те же карты, без дублей
//
#[test]
fn shuffle_keeps_every_card() {
    let cards: Vec<Card> = ["red", "green", "yellow", "white"]
        .iter()
        .flat_map(|suit| ["将", "士", "象", "车", "马", "炮", "卒"].map(|rank| Card::new(*suit, rank)))
        .collect();
    let mut deck = Deck::new(cards.clone());

    RngSeed::from_u64(9).to_rng().shuffle(&mut deck.cards);
    assert_eq!(deck.len(), cards.len());

    let mut sorted = deck.cards.clone();
    sorted.sort();
    let mut expected = cards;
    expected.sort();
    assert_eq!(sorted, expected);
}

//
// TEST 4: seed стола зависит от master seed и от id
//
#[test]
fn table_seed_derivation_is_stable() {
    let master = RngSeed::from_u64(42);
    assert_eq!(master.derive_for_table(7), master.derive_for_table(7));
    assert_ne!(master.derive_for_table(7), master.derive_for_table(8));
    assert_ne!(
        master.derive_for_table(7),
        RngSeed::from_u64(43).derive_for_table(7)
    );
    assert_ne!(master.derive_for_table(7), master);
}

//
// TEST 5: одна раздача 四色牌 на один seed
//
#[test]
fn same_table_seed_same_deal() {
    let rules = FourColorCard::from_config(&four_color::default_config()).unwrap();
    let config = four_color::default_config();
    let seed = RngSeed::from_u64(5).derive_for_table(1);

    let a = rules.initialize(&config, &[1, 2, 3, 4], &seed).unwrap();
    let b = rules.initialize(&config, &[1, 2, 3, 4], &seed).unwrap();
    assert_eq!(a, b);

    let other = rules
        .initialize(&config, &[1, 2, 3, 4], &RngSeed::from_u64(5).derive_for_table(2))
        .unwrap();
    assert_ne!(a.hands, other.hands);
}

//
// TEST 6: pick_index и chance не выходят за границы
//
#[test]
fn pick_index_and_chance_bounds() {
    let mut det = DeterministicRng::from_u64(77);
    let mut sys = SystemRng;
    for _ in 0..500 {
        assert!(det.pick_index(4) < 4);
        assert!(sys.pick_index(3) < 3);
        assert!(!det.chance(0.0));
        assert!(det.chance(1.0));
    }
    // Вероятность вне [0, 1] обрезается, а не паникует.
    assert!(sys.chance(2.5));
    assert!(!sys.chance(-1.0));
}
