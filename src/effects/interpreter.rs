//! Effect interpreter: runs a `Script` against a read-only snapshot.
//!
//! ## EffectApi
//!
//! The capability surface of one invocation. It exposes the snapshot, the
//! caster and source identity, the trigger context, a target selection
//! function whose source is fixed to the caster, and mutation methods that
//! only append to the invocation's private operation queue.
//!
//! ## Interpreter
//!
//! Walks the statement tree. Every statement and expression node costs one
//! step against the configured budget, and nesting is bounded. Target
//! selection is the only suspension point.
//!
//! An invocation either completes with its queue, declines (returned
//! `false`), or fails with an `EffectError`. Callers only apply the queue of
//! a completed invocation.

use std::future::Future;
use std::pin::Pin;

use crate::cards::{CardDefinition, CardKind, CardRegistry};
use crate::core::{EffectError, EngineConfig, GameSession, InstanceId, PlayerId};
use crate::triggers::TriggerContext;
use crate::zones::Zone;

use super::operation::Operation;
use super::script::{Expr, Script, Side, Stmt, Value};
use super::targeting::{resolve_targets, TargetChooser, TargetList, TargetSelector};

type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Where a script is running from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InvocationKind {
    Spell,
    Ability,
}

/// Identity and context of one script run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Invocation {
    pub kind: InvocationKind,

    /// Player the script acts for (spell caster or ability owner).
    pub caster: PlayerId,

    /// Card the script comes from.
    pub source: Option<InstanceId>,

    /// Damage event details for damage triggers.
    pub context: Option<TriggerContext>,

    /// Name used in failure log entries.
    pub label: String,
}

impl Invocation {
    /// A spell cast by `caster`.
    pub fn spell(caster: PlayerId, source: InstanceId, label: impl Into<String>) -> Self {
        Self {
            kind: InvocationKind::Spell,
            caster,
            source: Some(source),
            context: None,
            label: label.into(),
        }
    }

    /// A triggered ability of `source`, owned by `owner`.
    pub fn ability(
        owner: PlayerId,
        source: InstanceId,
        label: impl Into<String>,
        context: Option<TriggerContext>,
    ) -> Self {
        Self {
            kind: InvocationKind::Ability,
            caster: owner,
            source: Some(source),
            context,
            label: label.into(),
        }
    }
}

/// Capability-scoped API handed to one script invocation.
pub struct EffectApi<'a> {
    state: &'a GameSession,
    catalog: &'a CardRegistry,
    chooser: &'a dyn TargetChooser,
    invocation: &'a Invocation,
    ops: Vec<Operation>,
}

impl<'a> EffectApi<'a> {
    pub fn new(
        state: &'a GameSession,
        catalog: &'a CardRegistry,
        chooser: &'a dyn TargetChooser,
        invocation: &'a Invocation,
    ) -> Self {
        Self {
            state,
            catalog,
            chooser,
            invocation,
            ops: Vec::new(),
        }
    }

    /// Read-only snapshot taken before the invocation started.
    #[must_use]
    pub fn state(&self) -> &'a GameSession {
        self.state
    }

    #[must_use]
    pub fn caster(&self) -> PlayerId {
        self.invocation.caster
    }

    #[must_use]
    pub fn source(&self) -> Option<InstanceId> {
        self.invocation.source
    }

    #[must_use]
    pub fn context(&self) -> Option<&'a TriggerContext> {
        self.invocation.context.as_ref()
    }

    /// Select targets on behalf of the caster.
    pub async fn select_targets(&self, selector: &TargetSelector) -> TargetList {
        resolve_targets(
            selector,
            self.state,
            self.catalog,
            self.invocation.caster,
            self.invocation.source,
            self.chooser,
        )
        .await
    }

    /// Definition behind an instance in the snapshot.
    pub fn definition_of(&self, instance: InstanceId) -> Result<&'a CardDefinition, EffectError> {
        let card = self
            .state
            .instance(instance)
            .ok_or_else(|| EffectError::Missing(instance.to_string()))?;
        self.catalog
            .get(card.card_id)
            .map(|def| def.as_ref())
            .ok_or_else(|| EffectError::Missing(card.card_id.to_string()))
    }

    pub fn deal_damage_to_player(
        &mut self,
        player: PlayerId,
        amount: i64,
    ) -> Result<(), EffectError> {
        self.check_player(player)?;
        check_amount(amount)?;
        self.ops.push(Operation::DamagePlayer { player, amount });
        Ok(())
    }

    pub fn deal_damage_to_creature(
        &mut self,
        instance: InstanceId,
        amount: i64,
    ) -> Result<(), EffectError> {
        self.definition_of(instance)?;
        check_amount(amount)?;
        self.ops.push(Operation::DamageCreature { instance, amount });
        Ok(())
    }

    pub fn heal_player(&mut self, player: PlayerId, amount: i64) -> Result<(), EffectError> {
        self.check_player(player)?;
        check_amount(amount)?;
        self.ops.push(Operation::HealPlayer { player, amount });
        Ok(())
    }

    /// Queue a heal capped at the card's definition health.
    pub fn heal_creature(&mut self, instance: InstanceId, amount: i64) -> Result<(), EffectError> {
        let max_health = self.definition_of(instance)?.health;
        check_amount(amount)?;
        self.ops.push(Operation::HealCreature {
            instance,
            amount,
            max_health,
        });
        Ok(())
    }

    pub fn destroy_creature(&mut self, instance: InstanceId) -> Result<(), EffectError> {
        self.definition_of(instance)?;
        self.ops.push(Operation::DestroyCreature { instance });
        Ok(())
    }

    pub fn log(&mut self, message: impl Into<String>) {
        self.ops.push(Operation::Log {
            player: self.invocation.caster,
            description: message.into(),
        });
    }

    /// Owner draws a card. Only triggered abilities may do this.
    pub fn draw_card(&mut self) -> Result<(), EffectError> {
        self.require_ability("draw_card")?;
        self.ops.push(Operation::DrawCard {
            player: self.invocation.caster,
        });
        Ok(())
    }

    /// Owner gains energy. Only triggered abilities may do this.
    pub fn gain_energy(&mut self, amount: i64) -> Result<(), EffectError> {
        self.require_ability("gain_energy")?;
        check_amount(amount)?;
        self.ops.push(Operation::GainEnergy {
            player: self.invocation.caster,
            amount,
        });
        Ok(())
    }

    pub fn into_operations(self) -> Vec<Operation> {
        self.ops
    }

    fn check_player(&self, player: PlayerId) -> Result<(), EffectError> {
        if self.state.players.contains(player) {
            Ok(())
        } else {
            Err(EffectError::Missing(player.to_string()))
        }
    }

    fn require_ability(&self, call: &'static str) -> Result<(), EffectError> {
        match self.invocation.kind {
            InvocationKind::Ability => Ok(()),
            InvocationKind::Spell => Err(EffectError::CapabilityDenied(call)),
        }
    }
}

fn check_amount(amount: i64) -> Result<(), EffectError> {
    if amount < 0 {
        return Err(EffectError::NegativeAmount(amount));
    }
    Ok(())
}

/// Result of running one invocation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InvocationOutcome {
    /// Finished successfully; apply these.
    Completed(Vec<Operation>),
    /// Script returned `false`.
    Declined,
    /// Script raised or broke a sandbox limit.
    Failed(EffectError),
}

/// Script interpreter with sandbox limits.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Interpreter {
    step_budget: u32,
    max_depth: u32,
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::from_config(&EngineConfig::default())
    }
}

impl Interpreter {
    #[must_use]
    pub fn new(step_budget: u32, max_depth: u32) -> Self {
        Self { step_budget, max_depth }
    }

    #[must_use]
    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(config.script_step_budget, config.script_max_depth)
    }

    /// Run `script`; `Ok(false)` when it returned `false`.
    pub async fn run(&self, script: &Script, api: &mut EffectApi<'_>) -> Result<bool, EffectError> {
        let mut exec = Execution {
            api,
            vars: Vec::new(),
            steps: 0,
            step_budget: self.step_budget,
            max_depth: self.max_depth,
        };
        match exec.exec_block(&script.body, 0).await? {
            Flow::Return(Value::Bool(false)) => Ok(false),
            Flow::Return(_) | Flow::Next => Ok(true),
        }
    }

    /// Run one invocation against `state` and collect its operations.
    pub async fn invoke(
        &self,
        script: &Script,
        state: &GameSession,
        catalog: &CardRegistry,
        chooser: &dyn TargetChooser,
        invocation: &Invocation,
    ) -> InvocationOutcome {
        let mut api = EffectApi::new(state, catalog, chooser, invocation);
        match self.run(script, &mut api).await {
            Ok(true) => InvocationOutcome::Completed(api.into_operations()),
            Ok(false) => {
                tracing::debug!(label = %invocation.label, "Effect declined");
                InvocationOutcome::Declined
            }
            Err(error) => {
                tracing::warn!(label = %invocation.label, %error, "Effect failed");
                InvocationOutcome::Failed(error)
            }
        }
    }
}

enum Flow {
    Next,
    Return(Value),
}

struct Execution<'r, 'a> {
    api: &'r mut EffectApi<'a>,
    vars: Vec<(String, Value)>,
    steps: u32,
    step_budget: u32,
    max_depth: u32,
}

impl<'r, 'a> Execution<'r, 'a> {
    fn tick(&mut self) -> Result<(), EffectError> {
        self.steps += 1;
        if self.steps > self.step_budget {
            return Err(EffectError::BudgetExhausted(self.step_budget));
        }
        Ok(())
    }

    fn enter(&self, depth: u32) -> Result<(), EffectError> {
        if depth > self.max_depth {
            return Err(EffectError::TooDeep(self.max_depth));
        }
        Ok(())
    }

    fn lookup(&self, name: &str) -> Result<Value, EffectError> {
        self.vars
            .iter()
            .rev()
            .find(|(var, _)| var == name)
            .map(|(_, value)| value.clone())
            .ok_or_else(|| EffectError::UnknownVariable(name.to_string()))
    }

    fn exec_block<'x>(
        &'x mut self,
        body: &'x [Stmt],
        depth: u32,
    ) -> BoxFuture<'x, Result<Flow, EffectError>> {
        Box::pin(async move {
            self.enter(depth)?;
            let scope = self.vars.len();
            for stmt in body {
                if let Flow::Return(value) = self.exec_stmt(stmt, depth).await? {
                    self.vars.truncate(scope);
                    return Ok(Flow::Return(value));
                }
            }
            self.vars.truncate(scope);
            Ok(Flow::Next)
        })
    }

    fn exec_stmt<'x>(
        &'x mut self,
        stmt: &'x Stmt,
        depth: u32,
    ) -> BoxFuture<'x, Result<Flow, EffectError>> {
        Box::pin(async move {
            self.tick()?;
            match stmt {
                Stmt::Let { name, value } => {
                    let value = self.eval(value, depth + 1)?;
                    self.vars.push((name.clone(), value));
                }
                Stmt::SelectTargets { name, selector } => {
                    let picked = self.api.select_targets(selector).await;
                    let list = picked.into_iter().map(Value::from).collect();
                    self.vars.push((name.clone(), Value::List(list)));
                }
                Stmt::DealDamageToPlayer { player, amount } => {
                    let player = as_player(self.eval(player, depth + 1)?)?;
                    let amount = as_int(self.eval(amount, depth + 1)?)?;
                    self.api.deal_damage_to_player(player, amount)?;
                }
                Stmt::DealDamageToCreature { creature, amount } => {
                    let creature = as_card(self.eval(creature, depth + 1)?)?;
                    let amount = as_int(self.eval(amount, depth + 1)?)?;
                    self.api.deal_damage_to_creature(creature, amount)?;
                }
                Stmt::HealPlayer { player, amount } => {
                    let player = as_player(self.eval(player, depth + 1)?)?;
                    let amount = as_int(self.eval(amount, depth + 1)?)?;
                    self.api.heal_player(player, amount)?;
                }
                Stmt::HealCreature { creature, amount } => {
                    let creature = as_card(self.eval(creature, depth + 1)?)?;
                    let amount = as_int(self.eval(amount, depth + 1)?)?;
                    self.api.heal_creature(creature, amount)?;
                }
                Stmt::DestroyCreature { creature } => {
                    let creature = as_card(self.eval(creature, depth + 1)?)?;
                    self.api.destroy_creature(creature)?;
                }
                Stmt::Log { message } => {
                    let message = self.eval(message, depth + 1)?;
                    self.api.log(message.to_string());
                }
                Stmt::DrawCard => self.api.draw_card()?,
                Stmt::GainEnergy { amount } => {
                    let amount = as_int(self.eval(amount, depth + 1)?)?;
                    self.api.gain_energy(amount)?;
                }
                Stmt::If { condition, then, otherwise } => {
                    let branch = if self.eval(condition, depth + 1)?.is_truthy() {
                        then
                    } else {
                        otherwise
                    };
                    return self.exec_block(branch, depth + 1).await;
                }
                Stmt::ForEach { name, items, body } => {
                    let items = as_list(self.eval(items, depth + 1)?)?;
                    for item in items {
                        self.vars.push((name.clone(), item));
                        let flow = self.exec_block(body, depth + 1).await?;
                        self.vars.pop();
                        if let Flow::Return(value) = flow {
                            return Ok(Flow::Return(value));
                        }
                    }
                }
                Stmt::Return(value) => {
                    let value = self.eval(value, depth + 1)?;
                    return Ok(Flow::Return(value));
                }
                Stmt::Fail(message) => return Err(EffectError::Raised(message.clone())),
            }
            Ok(Flow::Next)
        })
    }

    fn eval(&mut self, expr: &Expr, depth: u32) -> Result<Value, EffectError> {
        self.tick()?;
        self.enter(depth)?;
        let next = depth + 1;

        let value = match expr {
            Expr::Int(n) => Value::Int(*n),
            Expr::Bool(b) => Value::Bool(*b),
            Expr::Text(text) => Value::Text(text.clone()),
            Expr::Var(name) => self.lookup(name)?,

            Expr::Caster => Value::Player(self.api.caster()),
            Expr::Opponent => {
                let caster = self.api.caster();
                self.api
                    .state()
                    .opponents_of(caster)
                    .next()
                    .map(Value::Player)
                    .ok_or_else(|| EffectError::Missing("opponent".into()))?
            }
            Expr::Source => self
                .api
                .source()
                .map(Value::Card)
                .ok_or_else(|| EffectError::Missing("source card".into()))?,

            Expr::TriggerTarget => self
                .api
                .context()
                .and_then(|c| c.damage_target)
                .map_or(Value::Unit, Value::from),
            Expr::TriggerSource => self
                .api
                .context()
                .and_then(|c| c.damage_source)
                .map_or(Value::Unit, Value::from),
            Expr::TriggerAmount => Value::Int(self.api.context().map_or(0, |c| c.damage_amount)),

            Expr::Health(of) => match self.eval(of, next)? {
                Value::Player(player) => Value::Int(self.player(player)?.health),
                Value::Card(card) => Value::Int(self.card_health(card)?),
                other => return Err(mismatch("player or card", &other)),
            },
            Expr::MaxHealth(of) => match self.eval(of, next)? {
                Value::Player(player) => Value::Int(self.player(player)?.max_health),
                Value::Card(card) => Value::Int(self.api.definition_of(card)?.health),
                other => return Err(mismatch("player or card", &other)),
            },
            Expr::Attack(of) => {
                let card = as_card(self.eval(of, next)?)?;
                Value::Int(self.api.definition_of(card)?.attack)
            }
            Expr::Energy(of) => {
                let player = as_player(self.eval(of, next)?)?;
                Value::Int(self.player(player)?.energy)
            }
            Expr::HandSize(of) => {
                let player = as_player(self.eval(of, next)?)?;
                Value::Int(self.player(player)?.zones.len(Zone::Hand) as i64)
            }
            Expr::Creatures { side } => self.permanents(*side, CardKind::Creature),
            Expr::Artifacts { side } => self.permanents(*side, CardKind::Artifact),

            Expr::Add(a, b) => self.arith(a, b, next, i64::checked_add)?,
            Expr::Sub(a, b) => self.arith(a, b, next, i64::checked_sub)?,
            Expr::Mul(a, b) => self.arith(a, b, next, i64::checked_mul)?,
            Expr::Min(a, b) => self.arith(a, b, next, |x, y| Some(x.min(y)))?,
            Expr::Max(a, b) => self.arith(a, b, next, |x, y| Some(x.max(y)))?,

            Expr::Eq(a, b) => {
                let a = self.eval(a, next)?;
                let b = self.eval(b, next)?;
                Value::Bool(a == b)
            }
            Expr::Lt(a, b) => {
                let a = as_int(self.eval(a, next)?)?;
                let b = as_int(self.eval(b, next)?)?;
                Value::Bool(a < b)
            }
            Expr::Gt(a, b) => {
                let a = as_int(self.eval(a, next)?)?;
                let b = as_int(self.eval(b, next)?)?;
                Value::Bool(a > b)
            }
            Expr::Not(a) => Value::Bool(!self.eval(a, next)?.is_truthy()),
            Expr::And(a, b) => {
                Value::Bool(self.eval(a, next)?.is_truthy() && self.eval(b, next)?.is_truthy())
            }
            Expr::Or(a, b) => {
                Value::Bool(self.eval(a, next)?.is_truthy() || self.eval(b, next)?.is_truthy())
            }

            Expr::Len(a) => match self.eval(a, next)? {
                Value::List(items) => Value::Int(items.len() as i64),
                Value::Text(text) => Value::Int(text.chars().count() as i64),
                other => return Err(mismatch("list or text", &other)),
            },
            Expr::First(a) => {
                as_list(self.eval(a, next)?)?.into_iter().next().unwrap_or(Value::Unit)
            }
            Expr::Concat(parts) => {
                let mut text = String::new();
                for part in parts {
                    text.push_str(&self.eval(part, next)?.to_string());
                }
                Value::Text(text)
            }
        };
        Ok(value)
    }

    fn arith(
        &mut self,
        a: &Expr,
        b: &Expr,
        depth: u32,
        op: impl Fn(i64, i64) -> Option<i64>,
    ) -> Result<Value, EffectError> {
        let a = as_int(self.eval(a, depth)?)?;
        let b = as_int(self.eval(b, depth)?)?;
        op(a, b).map(Value::Int).ok_or(EffectError::Overflow)
    }

    fn player(&self, player: PlayerId) -> Result<&'a crate::core::PlayerState, EffectError> {
        self.api
            .state()
            .player(player)
            .map_err(|_| EffectError::Missing(player.to_string()))
    }

    fn card_health(&self, card: InstanceId) -> Result<i64, EffectError> {
        self.api
            .state()
            .instance(card)
            .map(|c| c.current_health)
            .ok_or_else(|| EffectError::Missing(card.to_string()))
    }

    /// Battlefield permanents of one kind, in seat then insertion order.
    fn permanents(&self, side: Side, kind: CardKind) -> Value {
        let state = self.api.state();
        let caster = self.api.caster();
        let cards = state
            .players
            .player_ids()
            .filter(|&owner| match side {
                Side::Friendly => owner == caster,
                Side::Enemy => owner != caster,
                Side::Any => true,
            })
            .flat_map(|owner| state.battlefield(owner))
            .filter(|&id| self.api.definition_of(id).is_ok_and(|def| def.kind == kind))
            .map(Value::Card)
            .collect();
        Value::List(cards)
    }
}

fn mismatch(expected: &'static str, found: &Value) -> EffectError {
    EffectError::TypeMismatch {
        expected,
        found: found.type_name(),
    }
}

fn as_int(value: Value) -> Result<i64, EffectError> {
    match value {
        Value::Int(n) => Ok(n),
        other => Err(mismatch("int", &other)),
    }
}

fn as_player(value: Value) -> Result<PlayerId, EffectError> {
    match value {
        Value::Player(player) => Ok(player),
        other => Err(mismatch("player", &other)),
    }
}

fn as_card(value: Value) -> Result<InstanceId, EffectError> {
    match value {
        Value::Card(card) => Ok(card),
        other => Err(mismatch("card", &other)),
    }
}

fn as_list(value: Value) -> Result<Vec<Value>, EffectError> {
    match value {
        Value::List(items) => Ok(items),
        other => Err(mismatch("list", &other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cards::{CardDefinition, CardId};
    use crate::effects::{FirstTargetChooser, ScriptedChooser, Target};
    use crate::zones::ZonePosition;

    struct Fixture {
        session: GameSession,
        catalog: CardRegistry,
        wolf: InstanceId,
        bear: InstanceId,
    }

    fn fixture() -> Fixture {
        let mut catalog = CardRegistry::new();
        let wolf_def = CardDefinition::creature(CardId::new(1), "Wolf", 2, 3, 2);
        let bear_def = CardDefinition::creature(CardId::new(2), "Bear", 3, 2, 5);
        catalog.register(wolf_def.clone());
        catalog.register(bear_def.clone());

        let mut session = GameSession::new(["Alice", "Bob"], &EngineConfig::default()).unwrap();
        let wolf = session
            .create_instance(PlayerId::new(0), &wolf_def, Zone::Battlefield, ZonePosition::Top)
            .unwrap();
        let bear = session
            .create_instance(PlayerId::new(1), &bear_def, Zone::Battlefield, ZonePosition::Top)
            .unwrap();
        Fixture { session, catalog, wolf, bear }
    }

    async fn run_spell(
        f: &Fixture,
        script: &Script,
        chooser: &dyn TargetChooser,
    ) -> InvocationOutcome {
        let invocation = Invocation::spell(PlayerId::new(0), f.wolf, "Test Spell");
        Interpreter::default()
            .invoke(script, &f.session, &f.catalog, chooser, &invocation)
            .await
    }

    #[tokio::test]
    async fn test_no_return_is_success() {
        let f = fixture();
        let script = Script::new(vec![Stmt::damage_player(Expr::Opponent, 3), Stmt::log("hit")]);

        let outcome = run_spell(&f, &script, &FirstTargetChooser).await;

        assert_eq!(
            outcome,
            InvocationOutcome::Completed(vec![
                Operation::DamagePlayer { player: PlayerId::new(1), amount: 3 },
                Operation::Log { player: PlayerId::new(0), description: "hit".into() },
            ])
        );
    }

    #[tokio::test]
    async fn test_return_false_declines() {
        let f = fixture();
        let script = Script::new(vec![
            Stmt::damage_player(Expr::Opponent, 3),
            Stmt::Return(Expr::Bool(false)),
        ]);

        assert_eq!(run_spell(&f, &script, &FirstTargetChooser).await, InvocationOutcome::Declined);
    }

    #[tokio::test]
    async fn test_fail_discards_queue() {
        let f = fixture();
        let script = Script::new(vec![
            Stmt::damage_player(Expr::Opponent, 3),
            Stmt::Fail("boom".into()),
        ]);

        assert_eq!(
            run_spell(&f, &script, &FirstTargetChooser).await,
            InvocationOutcome::Failed(EffectError::Raised("boom".into()))
        );
    }

    #[tokio::test]
    async fn test_select_and_damage_each() {
        let f = fixture();
        let bear = Target::Creature { instance: f.bear, owner: PlayerId::new(1) };
        let script = Script::new(vec![
            Stmt::select("t", TargetSelector::enemy_creature()),
            Stmt::for_each("c", Expr::var("t"), vec![Stmt::damage_creature(Expr::var("c"), 2)]),
        ]);

        // Single candidate: resolved without asking
        let chooser = ScriptedChooser::default();
        let outcome = run_spell(&f, &script, &chooser).await;

        assert!(chooser.requests().is_empty());
        assert_eq!(
            outcome,
            InvocationOutcome::Completed(vec![Operation::DamageCreature {
                instance: bear.instance().unwrap(),
                amount: 2,
            }])
        );
    }

    #[tokio::test]
    async fn test_heal_creature_captures_max() {
        let f = fixture();
        let script = Script::new(vec![Stmt::HealCreature {
            creature: Expr::Source,
            amount: Expr::Int(4),
        }]);

        let outcome = run_spell(&f, &script, &FirstTargetChooser).await;

        assert_eq!(
            outcome,
            InvocationOutcome::Completed(vec![Operation::HealCreature {
                instance: f.wolf,
                amount: 4,
                max_health: 2,
            }])
        );
    }

    #[tokio::test]
    async fn test_owner_only_calls_denied_for_spells() {
        let f = fixture();
        let script = Script::new(vec![Stmt::DrawCard]);

        assert_eq!(
            run_spell(&f, &script, &FirstTargetChooser).await,
            InvocationOutcome::Failed(EffectError::CapabilityDenied("draw_card"))
        );

        let invocation = Invocation::ability(PlayerId::new(0), f.wolf, "Wolf: Draw", None);
        let outcome = Interpreter::default()
            .invoke(&script, &f.session, &f.catalog, &FirstTargetChooser, &invocation)
            .await;
        assert_eq!(
            outcome,
            InvocationOutcome::Completed(vec![Operation::DrawCard { player: PlayerId::new(0) }])
        );
    }

    #[tokio::test]
    async fn test_trigger_context_reads() {
        let f = fixture();
        let context = TriggerContext {
            damage_source: Some(Target::Creature { instance: f.bear, owner: PlayerId::new(1) }),
            damage_target: Some(Target::Creature { instance: f.wolf, owner: PlayerId::new(0) }),
            damage_amount: 2,
        };
        let script = Script::new(vec![Stmt::If {
            condition: Expr::gt(Expr::TriggerAmount, Expr::Int(1)),
            then: vec![Stmt::DealDamageToCreature {
                creature: Expr::TriggerSource,
                amount: Expr::TriggerAmount,
            }],
            otherwise: vec![],
        }]);
        let invocation =
            Invocation::ability(PlayerId::new(0), f.wolf, "Wolf: Thorns", Some(context));

        let outcome = Interpreter::default()
            .invoke(&script, &f.session, &f.catalog, &FirstTargetChooser, &invocation)
            .await;

        assert_eq!(
            outcome,
            InvocationOutcome::Completed(vec![Operation::DamageCreature {
                instance: f.bear,
                amount: 2,
            }])
        );
    }

    #[tokio::test]
    async fn test_state_reads_and_concat() {
        let f = fixture();
        let script = Script::new(vec![
            Stmt::Let {
                name: "n".into(),
                value: Expr::Len(Box::new(Expr::Creatures { side: Side::Any })),
            },
            Stmt::Log {
                message: Expr::Concat(vec![
                    Expr::text("creatures: "),
                    Expr::var("n"),
                    Expr::text(", bear hp "),
                    Expr::health(Expr::first(Expr::Creatures { side: Side::Enemy })),
                ]),
            },
        ]);

        let outcome = run_spell(&f, &script, &FirstTargetChooser).await;

        assert_eq!(
            outcome,
            InvocationOutcome::Completed(vec![Operation::Log {
                player: PlayerId::new(0),
                description: "creatures: 2, bear hp 5".into(),
            }])
        );
    }

    #[tokio::test]
    async fn test_errors() {
        let f = fixture();

        let unknown = Script::new(vec![Stmt::log("x"), Stmt::Log { message: Expr::var("nope") }]);
        assert_eq!(
            run_spell(&f, &unknown, &FirstTargetChooser).await,
            InvocationOutcome::Failed(EffectError::UnknownVariable("nope".into()))
        );

        let mismatched = Script::new(vec![Stmt::damage_player(Expr::Int(1), 1)]);
        assert_eq!(
            run_spell(&f, &mismatched, &FirstTargetChooser).await,
            InvocationOutcome::Failed(EffectError::TypeMismatch {
                expected: "player",
                found: "int",
            })
        );

        let negative = Script::new(vec![Stmt::damage_player(Expr::Opponent, -2)]);
        assert_eq!(
            run_spell(&f, &negative, &FirstTargetChooser).await,
            InvocationOutcome::Failed(EffectError::NegativeAmount(-2))
        );

        let overflow = Script::new(vec![Stmt::Let {
            name: "x".into(),
            value: Expr::add(Expr::Int(i64::MAX), Expr::Int(1)),
        }]);
        assert_eq!(
            run_spell(&f, &overflow, &FirstTargetChooser).await,
            InvocationOutcome::Failed(EffectError::Overflow)
        );
    }

    #[tokio::test]
    async fn test_step_budget() {
        let f = fixture();
        let items = Expr::Creatures { side: Side::Any };
        let body = vec![Stmt::log("tick"); 10];
        let script = Script::new(vec![Stmt::for_each("c", items, body)]);

        let invocation = Invocation::spell(PlayerId::new(0), f.wolf, "Loop");
        let outcome = Interpreter::new(15, 32)
            .invoke(&script, &f.session, &f.catalog, &FirstTargetChooser, &invocation)
            .await;

        assert_eq!(outcome, InvocationOutcome::Failed(EffectError::BudgetExhausted(15)));
    }

    #[tokio::test]
    async fn test_depth_limit() {
        let f = fixture();
        let mut expr = Expr::Int(0);
        for _ in 0..10 {
            expr = Expr::add(expr, Expr::Int(1));
        }
        let script = Script::new(vec![Stmt::Let { name: "x".into(), value: expr }]);

        let invocation = Invocation::spell(PlayerId::new(0), f.wolf, "Deep");
        let outcome = Interpreter::new(1_000, 4)
            .invoke(&script, &f.session, &f.catalog, &FirstTargetChooser, &invocation)
            .await;

        assert_eq!(outcome, InvocationOutcome::Failed(EffectError::TooDeep(4)));
    }
}
