// ============================================================
// Layer 1 — CLI / Presentation Layer
// ============================================================
// This is the entry point for all user interaction.
// It uses the `clap` crate to parse command line arguments.
// All business logic is delegated to Layer 2 (application).
//
// Commands:
//   1. `prepare`   — raw dataset → snapshot
//   2. `train`     — snapshot → checkpoint
//   3. `recommend` — checkpoint → top-k items for a user
//   4. `templates` — print every task's prompt templates

pub mod commands;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, PrepareArgs, RecommendArgs, TemplatesArgs, TrainArgs};

use crate::data::templates::{TaskInstance, TaskRegistry};

#[derive(Parser, Debug)]
#[command(
    name = "seqrec-prompt",
    version = "0.1.0",
    about = "Prepare sequential purchase data, render it into prompts and train a next-item recommender."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Match on the subcommand and dispatch to the correct use case.
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Prepare(args)   => run_prepare(args),
            Commands::Train(args)     => run_train(args),
            Commands::Recommend(args) => run_recommend(args),
            Commands::Templates(args) => run_templates(args),
        }
    }
}

fn run_prepare(args: PrepareArgs) -> Result<()> {
    use crate::application::prepare_use_case::PrepareUseCase;

    let snapshot = PrepareUseCase::new(args.into()).execute()?;
    println!(
        "Prepared '{}': {} users, {} interactions, {} items.",
        snapshot.name,
        snapshot.store.len(),
        snapshot.store.num_interactions(),
        snapshot.popularity.counts().len(),
    );
    Ok(())
}

fn run_train(args: TrainArgs) -> Result<()> {
    use crate::application::train_use_case::TrainUseCase;

    tracing::info!("Starting training on snapshot: {}", args.snapshot_path);
    TrainUseCase::new(args.into()).execute()?;
    println!("Training complete. Checkpoint saved.");
    Ok(())
}

fn run_recommend(args: RecommendArgs) -> Result<()> {
    use crate::application::recommend_use_case::RecommendUseCase;
    use crate::domain::traits::Recommender;

    let use_case = RecommendUseCase::new((&args).into())?;
    let items = use_case.recommend(&args.user, args.k)?;

    println!("\nTop {} for {}:", items.len(), args.user);
    for (rank, (item, score)) in items.iter().enumerate() {
        println!("{:>3}. {:<20} {:.4}", rank + 1, item, score);
    }
    if let Some(held_out) = use_case.held_out(&args.user) {
        println!("\nHeld-out next item: {held_out}");
    }
    Ok(())
}

fn run_templates(args: TemplatesArgs) -> Result<()> {
    let tasks: Vec<TaskInstance> = match &args.task {
        Some(alias) => vec![TaskRegistry::create(alias)?],
        None        => TaskRegistry::create_all(&TaskRegistry::names())?,
    };

    for task in tasks {
        println!("{:=^60}", format!(" {task} "));
        for template in task.all_templates() {
            println!("[{}] input:  {}", template.id, template.input.replace('\n', "\\n"));
            println!("    target: {}", template.target);
        }
        println!();
    }
    Ok(())
}
