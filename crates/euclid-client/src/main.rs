//! `euclid` — command-line client for a running Euclid's Window server.

use std::time::Duration;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use euclid_client::{ApiClient, ClientError, EvalQuery, JobPoller, JobState, DEFAULT_BASE_URL};
use euclid_common::models::{
    CheckStatus, LearnerLevel, OutputFormat, RenderQuality, ResponseMode, TutorRequest, VisualizationOnDemandRequest,
    VisualizationPayload, VisualizationStyle,
};
use indicatif::{ProgressBar, ProgressStyle};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "euclid")]
#[command(about = "Ask Euclid's Window maths questions from the terminal", long_about = None)]
struct Cli {
    /// Server base URL
    #[arg(short, long, env = "EUCLID_SERVER", default_value = DEFAULT_BASE_URL)]
    server: String,

    /// Print answers as HTML instead of markdown
    #[arg(long, global = true, action = clap::ArgAction::SetTrue)]
    html: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ask the tutor one question
    Ask {
        question: String,
        #[arg(short, long, value_enum, default_value_t = ModeArg::Both)]
        mode: ModeArg,
        #[arg(short, long, value_enum, default_value_t = LevelArg::Teen)]
        level: LevelArg,
    },

    /// Send a chat message, optionally continuing a conversation
    Chat {
        message: String,
        #[arg(short, long)]
        conversation: Option<String>,
    },

    /// Request a diagram
    Visualize {
        question: String,
        /// Poll the background job until the diagram is ready
        #[arg(short, long, action = clap::ArgAction::SetTrue)]
        wait: bool,
    },

    /// Request a Manim animation
    Animate {
        question: String,
        #[arg(short, long, value_enum, default_value_t = QualityArg::Low)]
        quality: QualityArg,
        #[arg(short, long, value_enum, default_value_t = FormatArg::Gif)]
        format: FormatArg,
        /// Poll the render until it finishes
        #[arg(short, long, action = clap::ArgAction::SetTrue)]
        wait: bool,
    },

    /// Show the prompt library
    Map {
        #[arg(short, long)]
        category: Option<String>,
    },

    /// Show the prerequisite graph around a concept
    Mindmap {
        slug: String,
        #[arg(short, long)]
        depth: Option<u32>,
    },

    /// Show effective settings
    Settings {
        /// Also check that the configured models are reachable
        #[arg(long, action = clap::ArgAction::SetTrue)]
        validate: bool,
    },

    /// Run the evaluation report
    Eval {
        #[arg(long, action = clap::ArgAction::SetTrue)]
        live: bool,
        #[arg(long)]
        label: Option<String>,
        /// Comma-separated run tags
        #[arg(long)]
        tags: Option<String>,
        #[arg(long, action = clap::ArgAction::SetTrue)]
        persist: bool,
        /// Print CSV instead of a summary
        #[arg(long, action = clap::ArgAction::SetTrue)]
        csv: bool,
        /// With --csv, export the latest persisted run
        #[arg(long, action = clap::ArgAction::SetTrue)]
        latest: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum ModeArg {
    Plain,
    Axiomatic,
    Both,
}

impl From<ModeArg> for ResponseMode {
    fn from(m: ModeArg) -> Self {
        match m {
            ModeArg::Plain => Self::Plain,
            ModeArg::Axiomatic => Self::Axiomatic,
            ModeArg::Both => Self::Both,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum LevelArg {
    Kids,
    Teen,
    College,
    Adult,
}

impl From<LevelArg> for LearnerLevel {
    fn from(l: LevelArg) -> Self {
        match l {
            LevelArg::Kids => Self::Kids,
            LevelArg::Teen => Self::Teen,
            LevelArg::College => Self::College,
            LevelArg::Adult => Self::Adult,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum QualityArg {
    Low,
    Medium,
    High,
}

impl From<QualityArg> for RenderQuality {
    fn from(q: QualityArg) -> Self {
        match q {
            QualityArg::Low => Self::Low,
            QualityArg::Medium => Self::Medium,
            QualityArg::High => Self::High,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum FormatArg {
    Gif,
    Mp4,
}

impl From<FormatArg> for OutputFormat {
    fn from(f: FormatArg) -> Self {
        match f {
            FormatArg::Gif => Self::Gif,
            FormatArg::Mp4 => Self::Mp4,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    if let Err(e) = run(cli).await {
        match e.downcast_ref::<ClientError>() {
            Some(client_err) => eprintln!("{}", client_err.user_message()),
            None => eprintln!("error: {e:#}"),
        }
        std::process::exit(1);
    }
    Ok(())
}

async fn run(cli: Cli) -> Result<()> {
    let client = ApiClient::new(&cli.server)?;
    let out = Output { html: cli.html };

    match cli.command {
        Commands::Ask { question, mode, level } => {
            let req = TutorRequest {
                question,
                history: None,
                response_mode: mode.into(),
                learner_level: level.into(),
            };
            let resp = client.tutor(&req).await?;
            out.markdown(&resp.solution);
            if let Some(plain) = &resp.plain_explanation {
                out.section("Plain explanation");
                out.markdown(plain);
            }
            if let Some(axiomatic) = &resp.axiomatic_explanation {
                out.section("Axiomatic explanation");
                out.markdown(axiomatic);
            }
            if !resp.checks.is_empty() {
                out.section("Checks");
                for check in &resp.checks {
                    let mark = if check.status == CheckStatus::Pass { "ok  " } else { "warn" };
                    println!("  [{mark}] {}: {}", check.name, check.details);
                }
            }
            out.list("Key takeaways", &resp.key_takeaways);
            out.list("Try next", &resp.next_questions);
            if let Some(viz) = &resp.visualization {
                print_visualization(viz);
            }
        }

        Commands::Chat { message, conversation } => {
            let resp = client.chat(&message, conversation.as_deref()).await?;
            out.markdown(&resp.response_text);
            if !resp.related_concepts.is_empty() {
                println!("\nRelated: {}", resp.related_concepts.join(", "));
            }
            if let Some(viz) = &resp.visualization {
                print_visualization(viz);
            }
            if let Some(id) = resp.conversation_id {
                println!("\nconversation: {id}");
            }
        }

        Commands::Visualize { question, wait } => {
            let req = VisualizationOnDemandRequest {
                question,
                style: VisualizationStyle::Diagram,
                quality: RenderQuality::Low,
                output_format: OutputFormat::Gif,
                async_render: true,
            };
            let resp = client.visualize(&req).await?;
            if let Some(viz) = &resp.visualization {
                print_visualization(viz);
            } else if let Some(job_id) = resp.visualization_job_id {
                if !wait {
                    println!("{}\njob: {job_id}", resp.message);
                    return Ok(());
                }
                let spinner = spinner("Building diagram")?;
                let done = JobPoller::visualization()
                    .poll_with_progress(|| client.visualization_job(&job_id), |job| show_progress(&spinner, job))
                    .await;
                spinner.finish_and_clear();
                match done?.visualization {
                    Some(viz) => print_visualization(&viz),
                    None => println!("The job finished without a diagram."),
                }
            } else {
                println!("{}", resp.error.unwrap_or(resp.message));
            }
        }

        Commands::Animate { question, quality, format, wait } => {
            let req = VisualizationOnDemandRequest {
                question,
                style: VisualizationStyle::Animation,
                quality: quality.into(),
                output_format: format.into(),
                async_render: true,
            };
            let resp = client.visualize(&req).await?;
            if let Some(viz) = &resp.visualization {
                print_visualization(viz);
            } else if let (Some(id), true) = (resp.animation_id.clone(), wait) {
                let spinner = spinner("Rendering animation")?;
                let done = JobPoller::animation()
                    .poll_with_progress(|| client.animation(&id), |job| show_progress(&spinner, job))
                    .await;
                spinner.finish_and_clear();
                let done = done?;
                println!("{}", done.url.unwrap_or_else(|| format!("animation {id} finished")));
            } else {
                println!("{}", resp.message);
                if let Some(id) = resp.animation_id {
                    println!("animation: {id}");
                }
            }
        }

        Commands::Map { category } => {
            let map = client.prompt_collections(category.as_deref()).await?;
            println!("{} topics, {} prompts", map.total_topics, map.total_prompts);
            for cat in &map.categories {
                println!("\n{} ({})", cat.category_name, cat.category_id);
                for topic in &cat.topics {
                    println!("  {} {}", topic.icon, topic.topic_name);
                    for prompt in &topic.prompts {
                        println!("    - {prompt}");
                    }
                }
            }
        }

        Commands::Mindmap { slug, depth } => {
            let map = client.mind_map(&slug, depth).await?;
            for node in &map.nodes {
                let marker = if node.is_target { "*" } else { " " };
                println!("{marker} [{}] {} ({})", node.level, node.name, node.category);
            }
            println!();
            for link in &map.links {
                println!("  {} -> {} ({:?})", link.source, link.target, link.relation);
            }
        }

        Commands::Settings { validate } => {
            let settings = client.settings().await?;
            println!("{}", serde_json::to_string_pretty(&settings)?);
            if validate {
                let checks = client.validate_settings().await?;
                for (name, check) in [
                    ("ollama", &checks.ollama_model),
                    ("diffusion", &checks.diffusion_model),
                    ("music", &checks.music_model),
                ] {
                    let state = if check.available { "available" } else { "unavailable" };
                    println!("{name}: {state} {}", check.message.as_deref().unwrap_or(""));
                }
            }
        }

        Commands::Eval { live, label, tags, persist, csv, latest } => {
            let query = EvalQuery {
                live,
                per_prompt_timeout_ms: None,
                run_label: label,
                run_tags: tags
                    .map(|t| t.split(',').map(str::trim).filter(|s| !s.is_empty()).map(str::to_string).collect())
                    .unwrap_or_default(),
                persist,
            };
            if csv {
                print!("{}", client.eval_csv(&query, latest).await?);
                return Ok(());
            }
            let spinner = spinner("Running evaluation")?;
            let report = client.eval_report(&query).await;
            spinner.finish_and_clear();
            let report = report?;
            println!("mode:                  {}", report.mode.as_str());
            println!("prompts:               {}", report.total_prompts);
            println!("avg duration:          {} ms", report.avg_duration_ms);
            println!("visualization coverage {:.1}%", report.visualization_coverage * 100.0);
            println!("avg checks pass rate   {:.1}%", report.avg_checks_pass_rate * 100.0);
            println!("timeouts / errors:     {} / {}", report.timeout_count, report.error_count);
            for (bucket, count) in &report.latency_histogram {
                println!("  {bucket:>10} {count}");
            }
        }
    }
    Ok(())
}

struct Output {
    html: bool,
}

impl Output {
    fn markdown(&self, text: &str) {
        if self.html {
            println!("{}", euclid_render::render_markdown(text));
        } else {
            println!("{}", text.trim_end());
        }
    }

    fn section(&self, title: &str) {
        println!("\n## {title}");
    }

    fn list(&self, title: &str, items: &[String]) {
        if items.is_empty() {
            return;
        }
        self.section(title);
        for item in items {
            println!("- {item}");
        }
    }
}

fn print_visualization(viz: &VisualizationPayload) {
    let kind = serde_json::to_value(viz.viz_type).ok().and_then(|v| v.as_str().map(str::to_string));
    println!("\nvisualization: {} [{}] ({})", viz.title, kind.unwrap_or_default(), viz.viz_id);
    if let Some(url) = viz.data.get("url").and_then(|u| u.as_str()) {
        println!("  {url}");
    }
}

fn spinner(message: &str) -> Result<ProgressBar> {
    let bar = ProgressBar::new_spinner().with_style(ProgressStyle::default_spinner().template("{spinner:.green} {msg} {elapsed}")?);
    bar.set_message(message.to_string());
    bar.enable_steady_tick(Duration::from_millis(100));
    Ok(bar)
}

fn show_progress<T: JobState>(spinner: &ProgressBar, job: &T) {
    spinner.set_message(format!("{} ({}%)", job.status().as_str(), job.progress()));
}
