//! Property tests: random action sequences never break session invariants.
//!
//! Health and energy stay within bounds, every instance sits in exactly one
//! zone, and a defeated player always ends the game.

use std::sync::Arc;

use ccg_arena::cards::{
    CardDefinition, CardDefinitionStore, CardId, CardRegistry, DefinitionCache, TriggerEvent,
    TriggeredAbility,
};
use ccg_arena::core::{EngineConfig, GameStatus, PlayerId};
use ccg_arena::effects::{
    valid_targets, Expr, FirstTargetChooser, Script, Stmt, TargetSelector,
};
use ccg_arena::engine::{GameEngine, MemoryDocumentStore};
use proptest::prelude::*;

const BLOOD_PACT: CardId = CardId::new(7);

fn catalog() -> CardRegistry {
    let mut catalog = CardRegistry::new();
    catalog.register(CardDefinition::creature(CardId::new(1), "Wolf", 1, 3, 2));
    catalog.register(CardDefinition::creature(CardId::new(2), "Bear", 2, 2, 5));
    catalog.register(CardDefinition::artifact(CardId::new(3), "Totem", 1, 4));
    catalog.register(CardDefinition::spell(
        CardId::new(4),
        "Firebolt",
        1,
        Script::new(vec![
            Stmt::select("targets", TargetSelector::enemy_creature()),
            Stmt::for_each(
                "t",
                Expr::var("targets"),
                vec![Stmt::damage_creature(Expr::var("t"), 3)],
            ),
            Stmt::damage_player(Expr::Opponent, 2),
        ]),
    ));
    catalog.register(CardDefinition::creature(CardId::new(5), "Thorn Bush", 2, 1, 4).with_ability(
        TriggeredAbility::new(
            TriggerEvent::TakeDamage,
            "Thorns",
            Script::new(vec![Stmt::If {
                condition: Expr::gt(Expr::TriggerAmount, Expr::Int(0)),
                then: vec![Stmt::damage_player(Expr::Opponent, 1)],
                otherwise: vec![],
            }]),
        ),
    ));
    catalog.register(CardDefinition::creature(CardId::new(6), "Mystic", 2, 1, 3).with_ability(
        TriggeredAbility::new(
            TriggerEvent::StartTurn,
            "Insight",
            Script::new(vec![Stmt::DrawCard, Stmt::GainEnergy { amount: Expr::Int(1) }]),
        ),
    ));
    // Lethal damage followed by a heal in the same script.
    catalog.register(CardDefinition::spell(
        BLOOD_PACT,
        "Blood Pact",
        1,
        Script::new(vec![
            Stmt::select("targets", TargetSelector::enemy_creature()),
            Stmt::for_each(
                "t",
                Expr::var("targets"),
                vec![
                    Stmt::damage_creature(Expr::var("t"), 10),
                    Stmt::HealCreature { creature: Expr::var("t"), amount: Expr::Int(2) },
                ],
            ),
        ]),
    ));
    catalog
}

fn deck(offset: u32) -> Vec<CardId> {
    (0..14).map(|i| CardId::new((i + offset) % 7 + 1)).collect()
}

#[derive(Clone, Debug)]
enum Step {
    Play(usize),
    AttackPlayer(usize),
    AttackCreature(usize, usize),
    EndTurn,
    Heal(i64),
    OutOfTurn,
}

fn step() -> impl Strategy<Value = Step> {
    prop_oneof![
        4 => (0usize..8).prop_map(Step::Play),
        3 => (0usize..8).prop_map(Step::AttackPlayer),
        3 => (0usize..8, 0usize..8).prop_map(|(a, d)| Step::AttackCreature(a, d)),
        3 => Just(Step::EndTurn),
        1 => (-1i64..4).prop_map(Step::Heal),
        1 => Just(Step::OutOfTurn),
    ]
}

async fn run(seed: u64, players: usize, steps: Vec<Step>) -> Result<(), String> {
    let source: Arc<dyn CardDefinitionStore> = Arc::new(catalog());
    let names: Vec<String> = (0..players).map(|i| format!("P{i}")).collect();
    let engine = GameEngine::new_game(
        Arc::new(MemoryDocumentStore::new()),
        names,
        EngineConfig::default().with_seed(seed).with_starting_energy(3),
        Arc::new(DefinitionCache::new(source)),
        Arc::new(FirstTargetChooser),
    )
    .map_err(|e| e.to_string())?;

    for seat in 0..players {
        engine.start_game_with_deck(PlayerId::new(seat as u8), deck(seat as u32)).await;
    }
    let catalog = catalog();

    for step in steps {
        let session = engine.snapshot();
        if session.status == GameStatus::Finished {
            break;
        }
        let player = session.current_player;
        match step {
            Step::Play(i) => {
                let cards = engine.playable_cards(player).await;
                if let Some(&card) = cards.get(i % cards.len().max(1)) {
                    let pact = session.instance(card).is_some_and(|c| c.card_id == BLOOD_PACT);
                    let selector = TargetSelector::enemy_creature();
                    let targets = valid_targets(&selector, &session, &catalog, player);
                    if engine.play_card(player, card).await && pact && !targets.is_empty() {
                        let after = engine.snapshot();
                        let survivors = targets
                            .iter()
                            .filter_map(|t| t.instance())
                            .filter(|&id| after.is_on_battlefield(id))
                            .count();
                        if survivors != targets.len() - 1 {
                            let total = targets.len();
                            return Err(format!("{survivors} of {total} pact targets survived"));
                        }
                    }
                }
            }
            Step::AttackPlayer(i) => {
                let attackers = engine.available_attackers(player).await;
                if let Some(&attacker) = attackers.get(i % attackers.len().max(1)) {
                    let (target, _) = session.players.next_seat(player);
                    engine.attack_player_with_creature(player, attacker, target).await;
                }
            }
            Step::AttackCreature(a, d) => {
                let attackers = engine.available_attackers(player).await;
                let defenders: Vec<_> = session
                    .opponents_of(player)
                    .flat_map(|p| session.battlefield(p))
                    .collect();
                if let (Some(&attacker), Some(&defender)) = (
                    attackers.get(a % attackers.len().max(1)),
                    defenders.get(d % defenders.len().max(1)),
                ) {
                    engine
                        .attack_creature_with_creature(player, attacker, defender)
                        .await;
                }
            }
            Step::EndTurn => {
                engine.end_player_turn(player).await;
            }
            Step::Heal(amount) => {
                engine.heal_creatures(player, amount).await;
            }
            Step::OutOfTurn => {
                let (other, _) = session.players.next_seat(player);
                let before = engine.snapshot().log.len();
                if engine.end_player_turn(other).await {
                    return Err("out-of-turn end_turn succeeded".into());
                }
                if engine.snapshot().log.len() != before + 1 {
                    return Err("rejected action did not log exactly one entry".into());
                }
            }
        }

        let session = engine.snapshot();
        session.check_invariants(&catalog)?;
        let defeated = session.players.iter().any(|(_, p)| p.health == 0);
        if defeated != (session.status == GameStatus::Finished) {
            return Err(format!("defeated={defeated} but status={:?}", session.status));
        }
    }
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn test_random_games_keep_invariants(
        seed in any::<u64>(),
        players in 2usize..4,
        steps in prop::collection::vec(step(), 1..60),
    ) {
        let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();
        let result = runtime.block_on(run(seed, players, steps));
        prop_assert!(result.is_ok(), "{:?}", result);
    }
}
