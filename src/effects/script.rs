//! Effect scripts: the typed language card abilities and spells are written in.
//!
//! A `Script` is a list of statements over a small expression language. It is
//! plain serde data, so designers author it as JSON next to the card:
//!
//! ```json
//! { "body": [
//!     { "select_targets": { "name": "t", "selector": { "kind": "creature" } } },
//!     { "for_each": { "name": "c", "items": { "var": "t" }, "body": [
//!         { "deal_damage_to_creature": { "creature": { "var": "c" }, "amount": { "int": 2 } } }
//!     ] } }
//! ] }
//! ```
//!
//! Scripts cannot touch state. They read a snapshot and queue operations
//! through `EffectApi`; see `interpreter`.

use serde::{Deserialize, Serialize};

use super::targeting::{Target, TargetSelector};
use crate::core::{InstanceId, PlayerId};

/// A complete ability or spell body.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Script {
    #[serde(default)]
    pub body: Vec<Stmt>,
}

impl Script {
    /// Create a script from statements.
    #[must_use]
    pub fn new(body: Vec<Stmt>) -> Self {
        Self { body }
    }

    /// Parse a script from JSON.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

/// Statements.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stmt {
    /// Bind a variable in the current block.
    Let { name: String, value: Expr },

    /// Ask for targets and bind them as a list. The only statement that may
    /// suspend.
    SelectTargets { name: String, selector: TargetSelector },

    DealDamageToPlayer { player: Expr, amount: Expr },
    DealDamageToCreature { creature: Expr, amount: Expr },
    HealPlayer { player: Expr, amount: Expr },
    HealCreature { creature: Expr, amount: Expr },
    DestroyCreature { creature: Expr },

    /// Write a line to the game log.
    Log { message: Expr },

    /// Owner draws a card. Triggered abilities only.
    DrawCard,

    /// Owner gains energy. Triggered abilities only.
    GainEnergy { amount: Expr },

    If {
        condition: Expr,
        then: Vec<Stmt>,
        #[serde(default)]
        otherwise: Vec<Stmt>,
    },

    /// Run `body` once per list element, bound to `name`.
    ForEach { name: String, items: Expr, body: Vec<Stmt> },

    /// Stop with a value; `false` marks the invocation failed.
    Return(Expr),

    /// Abort the invocation with an error.
    Fail(String),
}

impl Stmt {
    pub fn damage_player(player: Expr, amount: i64) -> Self {
        Stmt::DealDamageToPlayer { player, amount: Expr::Int(amount) }
    }

    pub fn damage_creature(creature: Expr, amount: i64) -> Self {
        Stmt::DealDamageToCreature { creature, amount: Expr::Int(amount) }
    }

    pub fn heal_player(player: Expr, amount: i64) -> Self {
        Stmt::HealPlayer { player, amount: Expr::Int(amount) }
    }

    pub fn log(text: impl Into<String>) -> Self {
        Stmt::Log { message: Expr::Text(text.into()) }
    }

    pub fn select(name: impl Into<String>, selector: TargetSelector) -> Self {
        Stmt::SelectTargets { name: name.into(), selector }
    }

    pub fn for_each(name: impl Into<String>, items: Expr, body: Vec<Stmt>) -> Self {
        Stmt::ForEach { name: name.into(), items, body }
    }
}

/// Which side of the board, relative to the caster.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Friendly,
    Enemy,
    Any,
}

/// Expressions. Evaluation never suspends.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Expr {
    Int(i64),
    Bool(bool),
    Text(String),
    Var(String),

    /// Player the effect acts for.
    Caster,
    /// First opponent of the caster.
    Opponent,
    /// Card the effect comes from.
    Source,

    /// What the triggering damage hit, `unit` outside damage triggers.
    TriggerTarget,
    /// What dealt the triggering damage, `unit` outside damage triggers.
    TriggerSource,
    /// Damage of the triggering event, 0 outside damage triggers.
    TriggerAmount,

    /// Current health of a player or card.
    Health(Box<Expr>),
    /// Max health of a player or card.
    MaxHealth(Box<Expr>),
    /// Attack of a card.
    Attack(Box<Expr>),
    /// Current energy of a player.
    Energy(Box<Expr>),
    /// Cards in a player's hand.
    HandSize(Box<Expr>),
    /// Creatures on the battlefield.
    Creatures { side: Side },
    /// Artifacts on the battlefield.
    Artifacts { side: Side },

    Add(Box<Expr>, Box<Expr>),
    Sub(Box<Expr>, Box<Expr>),
    Mul(Box<Expr>, Box<Expr>),
    Min(Box<Expr>, Box<Expr>),
    Max(Box<Expr>, Box<Expr>),

    Eq(Box<Expr>, Box<Expr>),
    Lt(Box<Expr>, Box<Expr>),
    Gt(Box<Expr>, Box<Expr>),
    Not(Box<Expr>),
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),

    Len(Box<Expr>),
    /// First list element, `unit` for an empty list.
    First(Box<Expr>),
    /// Render every part as text and join them.
    Concat(Vec<Expr>),
}

impl Expr {
    pub fn var(name: impl Into<String>) -> Self {
        Expr::Var(name.into())
    }

    pub fn text(text: impl Into<String>) -> Self {
        Expr::Text(text.into())
    }

    #[allow(clippy::should_implement_trait)]
    pub fn add(a: Expr, b: Expr) -> Self {
        Expr::Add(Box::new(a), Box::new(b))
    }

    pub fn gt(a: Expr, b: Expr) -> Self {
        Expr::Gt(Box::new(a), Box::new(b))
    }

    pub fn health(of: Expr) -> Self {
        Expr::Health(Box::new(of))
    }

    pub fn first(list: Expr) -> Self {
        Expr::First(Box::new(list))
    }
}

/// Runtime values.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Value {
    Unit,
    Int(i64),
    Bool(bool),
    Text(String),
    Player(PlayerId),
    Card(InstanceId),
    List(Vec<Value>),
}

impl Value {
    /// Type name used in error messages.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Unit => "unit",
            Value::Int(_) => "int",
            Value::Bool(_) => "bool",
            Value::Text(_) => "text",
            Value::Player(_) => "player",
            Value::Card(_) => "card",
            Value::List(_) => "list",
        }
    }

    /// Truthiness for conditions: only `false` and `unit` are false.
    #[must_use]
    pub fn is_truthy(&self) -> bool {
        !matches!(self, Value::Bool(false) | Value::Unit)
    }
}

impl From<Target> for Value {
    fn from(target: Target) -> Self {
        match target {
            Target::Player(player) => Value::Player(player),
            Target::Creature { instance, .. } | Target::Artifact { instance, .. } => {
                Value::Card(instance)
            }
        }
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Unit => Ok(()),
            Value::Int(n) => write!(f, "{n}"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Text(s) => f.write_str(s),
            Value::Player(p) => write!(f, "{p}"),
            Value::Card(c) => write!(f, "{c}"),
            Value::List(items) => {
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                Ok(())
            }
        }
    }
}
