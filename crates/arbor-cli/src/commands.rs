use std::cell::RefCell;
use std::rc::Rc;

use anyhow::{bail, Context};
use colored::Colorize;
use serde::Serialize;
use tracing::debug;

use arbor_fsm::{StateMachine, StateNode};
use arbor_tree::{AnyNode, NodeKey, ReferencesNode, Tree, ValueNode};

use crate::bootstrap::{LayerBootstrapper, RootHolder};
use crate::cli::*;
use crate::config::ArborConfig;
use crate::visualize::TreeView;

/// Id of the demo state machine under the first layer root.
pub const MACHINE_ID: &str = "fsm";
/// Id of the transition counter under the first layer root.
pub const COUNTER_ID: &str = "counter";
/// Id of the reference set mirroring the first layer root's children.
pub const CATALOG_ID: &str = "catalog";

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    let config = ArborConfig::resolve(cli.config.as_deref())?;
    let output = match cli.command {
        Command::Show => cmd_show(&config, cli.format)?,
        Command::Progress(args) => cmd_progress(&config, &args, cli.format)?,
        Command::Path(args) => cmd_path(&config, &args, cli.format)?,
    };
    if output.ends_with('\n') {
        print!("{output}");
    } else {
        println!("{output}");
    }
    Ok(())
}

/// The tree every command works on.
///
/// One root per configured layer. The first layer root carries a state
/// machine over the configured states, a counter of machine transitions
/// and a reference set listening to the root's children.
pub struct Demo {
    pub tree: Tree,
    pub layers: LayerBootstrapper<String>,
    pub main: RootHolder,
    pub machine: StateMachine,
    pub counter: ValueNode<i64>,
    pub catalog: ReferencesNode,
}

impl Demo {
    pub fn build(config: &ArborConfig) -> anyhow::Result<Self> {
        config.validate()?;
        let mut tree = Tree::new();
        let layers = LayerBootstrapper::new(&mut tree, config.layers.clone(), |tree, layer| {
            tree.create_node(layer.as_str())
        });
        let root = config
            .layers
            .first()
            .and_then(|layer| layers.layer_root(layer))
            .context("first layer has no root")?;
        let main = RootHolder::new(&mut tree, root);

        let states: Vec<NodeKey> = config
            .states
            .iter()
            .map(|id| StateNode::create(&mut tree, id.as_str()))
            .collect();
        let machine = StateMachine::<StateNode>::create(&mut tree, MACHINE_ID, &states, config.default_state);
        let counter = ValueNode::create(&mut tree, COUNTER_ID, 0i64);
        let catalog = ReferencesNode::<AnyNode>::create(&mut tree, CATALOG_ID);
        tree.add_children(root, &[machine.key(), counter.key(), catalog.key()])?;

        if let Some(set) = catalog.set(&tree) {
            set.listen_to_children(&mut tree, root);
        }
        machine.on_state_changed(&mut tree, move |tree, _| {
            let transitions = counter.value(tree).copied().unwrap_or(0);
            let _ = counter.set_value(tree, transitions + 1);
        });

        debug!(layers = config.layers.len(), states = states.len(), "demo tree built");
        Ok(Self {
            tree,
            layers,
            main,
            machine,
            counter,
            catalog,
        })
    }

    pub fn main_root(&self) -> anyhow::Result<NodeKey> {
        self.main
            .root()
            .with_context(|| format!("layer {} is gone", self.main.name()))
    }

    pub fn state_id(&self, state: Option<NodeKey>) -> Option<String> {
        state.and_then(|s| self.tree.id(s)).map(str::to_string)
    }

    /// Dispose all layers. Returns the number of nodes left in the tree.
    pub fn shutdown(mut self) -> usize {
        self.main.release(&mut self.tree);
        self.layers.shutdown(&mut self.tree);
        self.tree.len()
    }
}

fn cmd_show(config: &ArborConfig, format: OutputFormat) -> anyhow::Result<String> {
    let demo = Demo::build(config)?;
    let view = TreeView::capture(&demo.tree, &demo.layers.roots());
    let output = match format {
        OutputFormat::Text => view.render_text(),
        OutputFormat::Json => view.render_json()?,
    };
    demo.shutdown();
    Ok(output)
}

/// One state switch observed while progressing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Transition {
    pub step: usize,
    pub from: Option<String>,
    pub to: Option<String>,
    pub index: Option<i64>,
}

pub fn run_progress(demo: &mut Demo, args: &ProgressArgs) -> Vec<Transition> {
    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = seen.clone();
    let sub = demo.machine.on_state_changed(&mut demo.tree, move |_, change| {
        sink.borrow_mut().push((change.old, change.new));
    });

    let mut transitions = Vec::new();
    for step in 1..=args.steps {
        demo.machine.progress(&mut demo.tree, args.start, args.end);
        let changes: Vec<_> = seen.borrow_mut().drain(..).collect();
        for (old, new) in changes {
            transitions.push(Transition {
                step,
                from: demo.state_id(old),
                to: demo.state_id(new),
                index: demo.machine.current_index(&demo.tree),
            });
        }
    }
    demo.tree.unsubscribe(sub);
    transitions
}

fn cmd_progress(
    config: &ArborConfig,
    args: &ProgressArgs,
    format: OutputFormat,
) -> anyhow::Result<String> {
    let mut demo = Demo::build(config)?;
    let transitions = run_progress(&mut demo, args);
    let output = match format {
        OutputFormat::Json => serde_json::to_string_pretty(&transitions)?,
        OutputFormat::Text => {
            let mut out = match demo.state_id(demo.machine.current_state(&demo.tree)) {
                Some(current) => format!("{} {} transitions, now in {}\n", "✓".green().bold(), transitions.len(), current.yellow().bold()),
                None => format!("{} {} transitions, no current state\n", "✓".green().bold(), transitions.len()),
            };
            for t in &transitions {
                out.push_str(&format!(
                    "  step {}: {} -> {}\n",
                    t.step,
                    t.from.as_deref().unwrap_or("N/A").dimmed(),
                    t.to.as_deref().unwrap_or("N/A").cyan()
                ));
            }
            out
        }
    };
    demo.shutdown();
    Ok(output)
}

#[derive(Debug, Serialize)]
struct PathReport<'a> {
    from: &'a str,
    to: &'a str,
    path: String,
}

pub fn relative_path_in(demo: &Demo, layer: Option<&str>, from: &str, to: &str) -> anyhow::Result<String> {
    let root = match layer {
        Some(label) => demo
            .layers
            .layer_root(&label.to_string())
            .with_context(|| format!("unknown layer {label}"))?,
        None => demo.main_root()?,
    };
    let Some(origin) = demo.tree.get_node(root, from) else {
        bail!("no node at {from:?}");
    };
    let Some(target) = demo.tree.get_node(root, to) else {
        bail!("no node at {to:?}");
    };
    demo.tree
        .relative_path(origin, target)
        .with_context(|| format!("{from:?} and {to:?} are not related"))
}

fn cmd_path(config: &ArborConfig, args: &PathArgs, format: OutputFormat) -> anyhow::Result<String> {
    let demo = Demo::build(config)?;
    let path = relative_path_in(&demo, args.layer.as_deref(), &args.from, &args.to);
    demo.shutdown();
    let path = path?;
    Ok(match format {
        OutputFormat::Text if path.is_empty() => "(same node)".dimmed().to_string(),
        OutputFormat::Text => path.bold().to_string(),
        OutputFormat::Json => serde_json::to_string_pretty(&PathReport {
            from: &args.from,
            to: &args.to,
            path,
        })?,
    })
}

#[cfg(test)]
mod tests {
    use arbor_tree::Availability;

    use super::*;

    fn progress(steps: usize, start: Option<i64>, end: Option<i64>) -> ProgressArgs {
        ProgressArgs { steps, start, end }
    }

    #[test]
    fn demo_tree_layout() {
        let demo = Demo::build(&ArborConfig::default()).unwrap();
        let root = demo.main_root().unwrap();
        assert_eq!(demo.tree.id(root), Some("model"));
        assert_eq!(demo.layers.roots().len(), 3);

        assert!(demo.tree.has_node(root, "fsm/states/idle"));
        assert!(demo.tree.has_node(root, "fsm/state_index"));
        assert_eq!(demo.state_id(demo.machine.current_state(&demo.tree)).as_deref(), Some("idle"));

        let catalog = demo.catalog.set(&demo.tree).unwrap();
        assert_eq!(catalog.len(), 3);
        assert_eq!(catalog.references(Availability::Available).len(), 3);
        assert_eq!(demo.shutdown(), 0);
    }

    #[test]
    fn progress_cycles_and_counts_transitions() {
        let mut demo = Demo::build(&ArborConfig::default()).unwrap();
        let transitions = run_progress(&mut demo, &progress(3, None, None));

        let pairs: Vec<(Option<&str>, Option<&str>)> = transitions
            .iter()
            .map(|t| (t.from.as_deref(), t.to.as_deref()))
            .collect();
        assert_eq!(
            pairs,
            vec![
                (Some("idle"), Some("running")),
                (Some("running"), Some("stopped")),
                (Some("stopped"), Some("idle")),
            ]
        );
        assert_eq!(transitions[2].index, Some(0));
        assert_eq!(demo.counter.value(&demo.tree), Some(&3));
        demo.shutdown();
    }

    #[test]
    fn progress_respects_end_margin() {
        let mut demo = Demo::build(&ArborConfig::default()).unwrap();
        let transitions = run_progress(&mut demo, &progress(2, None, Some(-1)));
        let targets: Vec<_> = transitions.iter().map(|t| t.to.clone().unwrap()).collect();
        assert_eq!(targets, vec!["running", "idle"]);
        demo.shutdown();
    }

    #[test]
    fn progress_without_states_reports_nothing() {
        let config = ArborConfig {
            states: Vec::new(),
            ..ArborConfig::default()
        };
        let mut demo = Demo::build(&config).unwrap();
        assert!(run_progress(&mut demo, &progress(4, None, None)).is_empty());
        assert_eq!(demo.counter.value(&demo.tree), Some(&0));
        demo.shutdown();
    }

    #[test]
    fn paths_between_demo_nodes() {
        let demo = Demo::build(&ArborConfig::default()).unwrap();
        assert_eq!(relative_path_in(&demo, None, "fsm/states/idle", "counter").unwrap(), "../../../counter");
        assert_eq!(relative_path_in(&demo, None, "", "fsm/state_index").unwrap(), "fsm/state_index");
        assert_eq!(relative_path_in(&demo, None, "counter", "counter").unwrap(), "");
        assert_eq!(relative_path_in(&demo, Some("view"), "", "").unwrap(), "");
        assert!(relative_path_in(&demo, None, "missing", "").is_err());
        assert!(relative_path_in(&demo, Some("nope"), "", "").is_err());
        demo.shutdown();
    }

    #[test]
    fn show_renders_every_layer() {
        colored::control::set_override(false);
        let text = cmd_show(&ArborConfig::default(), OutputFormat::Text).unwrap();
        assert!(text.contains("model [Available]"));
        assert!(text.contains("  fsm [Available] Current: idle"));
        assert!(text.contains("  catalog [Available] (3)"));
        assert!(text.lines().any(|line| line == "controller [Available] -"));

        let json = cmd_show(&ArborConfig::default(), OutputFormat::Json).unwrap();
        let rows: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert!(rows.as_array().unwrap().iter().any(|row| row["path"] == "fsm/states/running"));
    }

    #[test]
    fn invalid_config_is_refused() {
        let config = ArborConfig {
            layers: vec!["a/b".into()],
            ..ArborConfig::default()
        };
        assert!(Demo::build(&config).is_err());
    }
}
