//! Collaborators every rule function needs.
//!
//! `RuleContext` bundles the loaded catalog, configuration, clock, target
//! chooser and interpreter so rule functions take one argument instead of
//! five. It borrows everything; the engine builds one per transaction.

use crate::cards::{CardDefinition, CardRegistry};
use crate::core::{Clock, EngineConfig, EngineError, GameSession, InstanceId};
use crate::effects::{Interpreter, Target, TargetChooser};

/// Borrowed collaborators for one transaction.
pub struct RuleContext<'a> {
    /// Definitions of every card the session references.
    pub catalog: &'a CardRegistry,
    pub config: &'a EngineConfig,
    pub clock: &'a dyn Clock,
    pub chooser: &'a dyn TargetChooser,
    pub interpreter: Interpreter,
}

impl<'a> RuleContext<'a> {
    pub fn new(
        catalog: &'a CardRegistry,
        config: &'a EngineConfig,
        clock: &'a dyn Clock,
        chooser: &'a dyn TargetChooser,
    ) -> Self {
        Self {
            catalog,
            config,
            clock,
            chooser,
            interpreter: Interpreter::from_config(config),
        }
    }

    /// Timestamp for log entries.
    #[must_use]
    pub fn now(&self) -> u64 {
        self.clock.now_millis()
    }

    /// Definition behind an instance.
    pub fn definition(
        &self,
        session: &GameSession,
        instance: InstanceId,
    ) -> Result<&'a CardDefinition, EngineError> {
        let card = session.require_instance(instance)?;
        Ok(self.catalog.require(card.card_id)?.as_ref())
    }

    /// Target describing a permanent, `None` for spells and unknown cards.
    #[must_use]
    pub fn target_of(&self, session: &GameSession, instance: InstanceId) -> Option<Target> {
        let card = session.instance(instance)?;
        let kind = self.catalog.get(card.card_id)?.kind;
        Target::card(kind, instance, card.owner)
    }

    /// Card name for log lines.
    #[must_use]
    pub fn card_name(&self, session: &GameSession, instance: InstanceId) -> &'a str {
        session
            .instance(instance)
            .and_then(|card| self.catalog.get(card.card_id))
            .map_or("Unknown card", |def| def.name.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cards::CardId;
    use crate::core::{ManualClock, PlayerId};
    use crate::effects::FirstTargetChooser;
    use crate::zones::{Zone, ZonePosition};

    #[test]
    fn test_lookups() {
        let def = CardDefinition::artifact(CardId::new(3), "Totem", 1, 4);
        let mut catalog = CardRegistry::new();
        catalog.register(def.clone());
        let config = EngineConfig::default();
        let clock = ManualClock::new(42);
        let ctx = RuleContext::new(&catalog, &config, &clock, &FirstTargetChooser);

        let mut session = GameSession::new(["A", "B"], &config).unwrap();
        let totem = session
            .create_instance(PlayerId::new(1), &def, Zone::Battlefield, ZonePosition::Top)
            .unwrap();

        assert_eq!(ctx.now(), 42);
        assert_eq!(ctx.card_name(&session, totem), "Totem");
        assert_eq!(ctx.card_name(&session, InstanceId::new(99)), "Unknown card");
        assert_eq!(
            ctx.target_of(&session, totem),
            Some(Target::Artifact { instance: totem, owner: PlayerId::new(1) })
        );
        assert!(ctx.definition(&session, InstanceId::new(99)).is_err());
    }
}
