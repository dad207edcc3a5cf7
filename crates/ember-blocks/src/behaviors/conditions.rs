use rand::Rng;

use crate::block::{run_sequence, Behavior, Block};
use crate::context::ExecutionContext;
use crate::interpolate::interpolate;
use crate::outcome::Outcome;
use crate::value::{Comparator, Value};

/// Shared comparison behavior for the five `cond.*` comparison identifiers,
/// specialized by operator at construction. Children run on a passing
/// check; a failing check is still `Success` so later siblings continue.
pub struct CompareBehavior {
    pub op: Comparator,
}

impl CompareBehavior {
    fn rhs(block: &Block, ctx: &ExecutionContext) -> Value {
        match block.param("value") {
            Some(Value::Str(s)) => Value::Str(interpolate(s, ctx)),
            Some(other) => other.clone(),
            None => Value::Null,
        }
    }
}

impl Behavior for CompareBehavior {
    fn execute(&self, block: &Block, ctx: &mut ExecutionContext) -> Outcome {
        let Some(var) = block.str_param("var") else {
            return Outcome::err("missing var parameter");
        };
        let lhs = ctx.var(var).unwrap_or(Value::Null);
        let rhs = Self::rhs(block, ctx);
        if lhs.compare(self.op, &rhs) {
            run_sequence(block.children(), ctx)
        } else {
            Outcome::ok()
        }
    }

    fn validate(&self, block: &Block) -> Result<(), String> {
        if block.str_param("var").is_none() {
            return Err("missing var parameter".into());
        }
        if block.param("value").is_none() {
            return Err("missing value parameter".into());
        }
        Ok(())
    }
}

/// Runs children with the configured percent probability.
pub struct ChanceBehavior;

impl Behavior for ChanceBehavior {
    fn execute(&self, block: &Block, ctx: &mut ExecutionContext) -> Outcome {
        let Some(percent) = block.float_param("percent", ctx) else {
            return Outcome::err("missing percent parameter");
        };
        let roll: f64 = rand::thread_rng().gen_range(0.0..100.0);
        if roll < percent.clamp(0.0, 100.0) {
            run_sequence(block.children(), ctx)
        } else {
            Outcome::ok()
        }
    }

    fn validate(&self, block: &Block) -> Result<(), String> {
        match block.param("percent") {
            Some(v) if v.as_f64().is_some() => Ok(()),
            Some(_) => Err("percent parameter must be numeric".into()),
            None => Err("missing percent parameter".into()),
        }
    }
}

/// Passes when the occurrence happened in the named world. The dispatcher
/// seeds the `world` variable from the occurrence payload.
pub struct InWorldBehavior;

impl Behavior for InWorldBehavior {
    fn execute(&self, block: &Block, ctx: &mut ExecutionContext) -> Outcome {
        let Some(expected) = block.text_param("world", ctx) else {
            return Outcome::err("missing world parameter");
        };
        let current = ctx.var("world").unwrap_or(Value::Null);
        if current.as_str() == Some(expected.as_str()) {
            run_sequence(block.children(), ctx)
        } else {
            Outcome::ok()
        }
    }

    fn validate(&self, block: &Block) -> Result<(), String> {
        if block.param("world").is_none() {
            return Err("missing world parameter".into());
        }
        Ok(())
    }
}

/// Passes when a current target is set.
pub struct HasTargetBehavior;

impl Behavior for HasTargetBehavior {
    fn execute(&self, block: &Block, ctx: &mut ExecutionContext) -> Outcome {
        if ctx.target().is_some() {
            run_sequence(block.children(), ctx)
        } else {
            Outcome::ok()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::test_support::test_context;
    use crate::factory::BlockFactory;

    fn marker(factory: &BlockFactory, var: &str) -> Block {
        let mut block = factory.create("action.set_var").unwrap();
        block.set_parameter("var", Value::from(var));
        block.set_parameter("value", Value::Bool(true));
        block
    }

    #[test]
    fn test_passing_comparison_runs_children() {
        let factory = BlockFactory::new();
        let mut cond = factory.create("cond.equals").unwrap();
        cond.set_parameter("var", Value::from("x"));
        cond.set_parameter("value", Value::Int(3));
        cond.add_child(marker(&factory, "hit"));

        let (mut ctx, _rx) = test_context();
        ctx.set_var("x", Value::Int(3));
        assert!(cond.execute(&mut ctx).is_success());
        assert_eq!(ctx.var("hit"), Some(Value::Bool(true)));
    }

    #[test]
    fn test_failing_comparison_skips_children() {
        let factory = BlockFactory::new();
        let mut cond = factory.create("cond.greater").unwrap();
        cond.set_parameter("var", Value::from("x"));
        cond.set_parameter("value", Value::Int(10));
        cond.add_child(marker(&factory, "hit"));

        let (mut ctx, _rx) = test_context();
        ctx.set_var("x", Value::Int(3));
        assert!(cond.execute(&mut ctx).is_success());
        assert_eq!(ctx.var("hit"), None);
    }

    #[test]
    fn test_comparison_rhs_interpolates() {
        let factory = BlockFactory::new();
        let mut cond = factory.create("cond.equals").unwrap();
        cond.set_parameter("var", Value::from("greeting"));
        cond.set_parameter("value", Value::from("hi %name%"));
        cond.add_child(marker(&factory, "hit"));

        let (mut ctx, _rx) = test_context();
        ctx.set_var("name", Value::from("Ann"));
        ctx.set_var("greeting", Value::from("hi Ann"));
        cond.execute(&mut ctx);
        assert_eq!(ctx.var("hit"), Some(Value::Bool(true)));
    }

    #[test]
    fn test_chance_extremes() {
        let factory = BlockFactory::new();
        let (mut ctx, _rx) = test_context();

        let mut always = factory.create("cond.chance").unwrap();
        always.set_parameter("percent", Value::Int(100));
        always.add_child(marker(&factory, "always"));
        always.execute(&mut ctx);
        assert_eq!(ctx.var("always"), Some(Value::Bool(true)));

        let mut never = factory.create("cond.chance").unwrap();
        never.set_parameter("percent", Value::Int(0));
        never.add_child(marker(&factory, "never"));
        never.execute(&mut ctx);
        assert_eq!(ctx.var("never"), None);
    }

    #[test]
    fn test_in_world_reads_seeded_variable() {
        let factory = BlockFactory::new();
        let mut cond = factory.create("cond.in_world").unwrap();
        cond.set_parameter("world", Value::from("arena"));
        cond.add_child(marker(&factory, "hit"));

        let (mut ctx, _rx) = test_context();
        ctx.set_var("world", Value::from("arena"));
        cond.execute(&mut ctx);
        assert_eq!(ctx.var("hit"), Some(Value::Bool(true)));
    }
}
