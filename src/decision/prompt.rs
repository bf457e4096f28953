//! Prompt composition for direction decisions

use std::fmt::Write;

use crate::config::{DecisionConfig, EnemyVisibility, GridConfig};

/// Everything a prompt needs about the asking agent
#[derive(Debug, Clone)]
pub struct PromptContext<'a> {
    pub name: &'a str,
    pub grid: &'a str,
}

/// Compose the prompt: identity, legend, task framing, the grid, then the
/// output contract the parser relies on.
pub fn build_prompt(ctx: &PromptContext<'_>, grid: &GridConfig, decision: &DecisionConfig) -> String {
    let agent = &decision.agent_noun;
    let pickup = &decision.pickup_noun;
    let mut prompt = String::with_capacity(1024 + ctx.grid.len());

    // Writing into a String cannot fail
    let _ = writeln!(
        prompt,
        "You are {}, a {} AI in a game. The game state is shown below as ASCII:",
        ctx.name, agent
    );
    let _ = writeln!(prompt, "'{}' is empty space", grid.empty);
    let _ = writeln!(prompt, "'{}' is a piece of {}", grid.pickup, pickup);
    let _ = writeln!(prompt, "'{}' is your {}", grid.own, agent);
    if grid.enemies == EnemyVisibility::Shown {
        let _ = writeln!(prompt, "'{}' is an enemy {}", grid.enemy, agent);
    }

    let _ = writeln!(prompt);
    let _ = writeln!(
        prompt,
        "You must move towards the nearest {} in order to collect it before enemy {}s can!",
        pickup, agent
    );
    let _ = writeln!(prompt, "The game space is surrounded by walls you cannot pass through.");
    let _ = writeln!(
        prompt,
        "You can only change direction every few seconds, so try and get it right the first time."
    );

    let _ = writeln!(prompt);
    let _ = writeln!(
        prompt,
        "Decide where to move, based on this game state. Remember that you are '{}' and you want to move towards the nearest '{}':",
        grid.own, grid.pickup
    );
    let _ = writeln!(prompt, "{}", ctx.grid);

    let _ = writeln!(prompt);
    let _ = writeln!(
        prompt,
        "Be brief. Your response must finish with two numbers between -1 and 1 representing x and y direction vectors, separated by a comma."
    );
    let _ = writeln!(prompt, "The vectors are relative to an 0,0 position in the top left of the screen.");
    let _ = writeln!(prompt, "The first number is the horizontal (x) direction: -1 is left, 1 is right.");
    let _ = writeln!(prompt, "The second number is the vertical (y) direction: -1 is up, 1 is down.");
    let _ = write!(
        prompt,
        "For example: \"0.5,-0.7\" will move the {} up and to the right. \"0.0,1.0\" will move the {} directly down.",
        agent, agent
    );

    prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{GameVariant, SimConfig};
    use crate::decision::parse::parse_direction;

    fn ctx() -> PromptContext<'static> {
        PromptContext {
            name: "GPT 4o-mini",
            grid: "S...\n..o.",
        }
    }

    #[test]
    fn test_fish_prompt() {
        let config = SimConfig::preset(GameVariant::Fish);
        let prompt = build_prompt(&ctx(), &config.grid, &config.decision);

        assert!(prompt.starts_with("You are GPT 4o-mini, a fish AI"));
        assert!(prompt.contains("'o' is a piece of fish food"));
        assert!(prompt.contains("'S' is your fish"));
        assert!(!prompt.contains("'E'"));
        assert!(prompt.contains("S...\n..o."));
        assert!(prompt.contains("-1 is up, 1 is down"));
    }

    #[test]
    fn test_ship_prompt_has_enemy_legend() {
        let config = SimConfig::preset(GameVariant::Ship);
        let prompt = build_prompt(&ctx(), &config.grid, &config.decision);

        assert!(prompt.contains("a ship AI"));
        assert!(prompt.contains("'$' is a piece of doubloon"));
        assert!(prompt.contains("'E' is an enemy ship"));
    }

    #[test]
    fn test_worked_example_parses() {
        let config = SimConfig::default();
        let prompt = build_prompt(&ctx(), &config.grid, &config.decision);
        let parsed = parse_direction(&prompt).unwrap();
        assert!(parsed.approx_eq(crate::util::vec2::Vec2::new(0.0, 1.0), 1e-6));
    }
}
