use ascii_tree::{write_tree, Tree};
use mabench_types::{ResponseOutcome, SolveResult, StepOutcome, TrajectoryStep};

/// Renders a `SolveResult` into a human-readable ASCII tree.
///
/// Gives a quick overview of the run directly in the terminal: the final
/// reward and termination, each action with its outcome, and the final
/// response.
pub fn render_result_as_tree(result: &SolveResult) -> Result<String, std::fmt::Error> {
    let status_icon = if result.succeeded() { "✅" } else { "❌" };
    let reward_percent = result.reward.reward * 100.0;
    let mut root_label = format!(
        "{} {} (Reward: {:.1}%): {}",
        status_icon,
        result.task_id,
        reward_percent,
        result.termination()
    );
    if let Some(reason) = result.reward.voided_by {
        root_label.push_str(&format!(" [voided by {reason}]"));
    }

    let mut children: Vec<Tree> = result
        .run
        .trajectory
        .iter()
        .enumerate()
        .map(|(i, step)| render_step_node(i + 1, step))
        .collect();

    if let Some(error) = &result.run.error {
        children.push(Tree::Leaf(vec![format!("ERROR: {error}")]));
    }
    children.push(render_response_node(&result.run.response));

    let actions = &result.reward.actions;
    children.push(Tree::Leaf(vec![format!(
        "ACTIONS: {:.2} ({} matched, {} missing, {} extraneous, {} conflicting)",
        actions.score,
        actions.matched.len(),
        actions.missing.len(),
        actions.extraneous.len(),
        actions.conflicts.len()
    )]));

    let tree = Tree::Node(root_label, children);
    let mut buffer = String::new();
    write_tree(&mut buffer, &tree)?;
    Ok(buffer)
}

/// Renders a single trajectory step into a `Tree` node.
fn render_step_node(step_number: usize, step: &TrajectoryStep) -> Tree {
    let step_label = format!("Step {step_number} (turn {})", step.turn);
    let action_node = Tree::Leaf(vec![format!("ACTION: {}", step.action)]);

    let outcome_leaf = match &step.outcome {
        StepOutcome::Applied { output } => {
            let kind = if step.mutating { "write" } else { "read" };
            format!("APPLIED ({kind}): {output}")
        }
        StepOutcome::Failed { error } => format!("FAILED: {error}"),
        StepOutcome::Rejected { error } => format!("REJECTED: {error}"),
    };

    Tree::Node(step_label, vec![action_node, Tree::Leaf(vec![outcome_leaf])])
}

fn render_response_node(response: &ResponseOutcome) -> Tree {
    let label = match response {
        ResponseOutcome::Missing => "RESPONSE: none".to_string(),
        ResponseOutcome::Parsed(parsed) => format!("RESPONSE: {}", parsed.to_message()),
        ResponseOutcome::Failed(failure) => format!("RESPONSE: unparseable ({failure})"),
    };
    Tree::Leaf(vec![label])
}
