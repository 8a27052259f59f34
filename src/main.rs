use std::path::PathBuf;
use std::time::Instant;

use clap::{Args, Parser, Subcommand, ValueEnum};
use env_logger::{Builder, Env};
use log::{debug, info, warn, LevelFilter};

use stroke_risk::config::{Settings, DEFAULT_MODEL_PATH, LOG_ENV, MODEL_PATH_ENV};
use stroke_risk::io::{feature_frame, read_records, write_csv, write_parquet, write_predictions, PredictionRow};
use stroke_risk::records::parse_flag;
use stroke_risk::report::PredictionReport;
use stroke_risk::{encode, encode_all, score_batch, score_with, RawRecord, StrokeRiskError};

#[tokio::main]
async fn main() -> Result<(), StrokeRiskError> {
    let cli = StrokeRiskArgs::parse();

    let log_level = match cli.verbose {
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };

    let env = Env::new().filter(LOG_ENV);
    Builder::new()
        .filter(Some("stroke_risk"), log_level)
        .parse_env(env)
        .init();

    debug!("Arguments {:#?}", cli);

    let start_time = Instant::now();
    run(cli).await?;
    debug!("finished in {:?}", start_time.elapsed());
    Ok(())
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Stroke risk scoring from patient attributes", long_about = None)]
#[command(propagate_version = true)]
struct StrokeRiskArgs {
    #[arg(short, long, env = MODEL_PATH_ENV, default_value = DEFAULT_MODEL_PATH, help = "Model artifact (JSON tree ensemble)")]
    model: PathBuf,
    #[arg(short, long, action = clap::ArgAction::Count, global = true, help = "Verbose level")]
    verbose: u8,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Score a single patient
    Predict(PredictArgs),
    /// Score every row of a CSV file
    Batch(BatchArgs),
    /// Write the encoded feature matrix of a CSV file
    Encode(EncodeArgs),
}

#[derive(Args, Debug)]
struct ExplainArgs {
    #[arg(long, default_value_t = stroke_risk::scorer::DEFAULT_TOP_FACTORS, help = "Number of ranked factors")]
    top: usize,
    #[arg(long, help = "Skip the feature attribution step")]
    no_explain: bool,
}

#[derive(Args, Debug)]
struct PredictArgs {
    #[arg(long, default_value_t = 50.0, help = "Age in years (0-120)")]
    age: f64,
    #[arg(long, default_value = "Male", help = "Male or Female")]
    gender: String,
    #[arg(long, default_value = "No", help = "Yes or No")]
    hypertension: String,
    #[arg(long, default_value = "No", help = "Yes or No")]
    heart_disease: String,
    #[arg(long, default_value = "Yes", help = "Yes or No")]
    ever_married: String,
    #[arg(long, default_value_t = 100.0, help = "Average glucose level in mg/dL (50-300)")]
    avg_glucose_level: f64,
    #[arg(long, default_value_t = 25.0, help = "Body mass index (10-60)")]
    bmi: f64,
    #[arg(long, default_value = "Urban", help = "Urban or Rural")]
    residence_type: String,
    #[arg(long, default_value = "Private", help = "Private, Self-employed, Govt job, Never worked or Children")]
    work_type: String,
    #[arg(long, default_value = "never smoked", help = "never smoked, formerly smoked, smokes or Unknown")]
    smoking_status: String,
    #[command(flatten)]
    explain: ExplainArgs,
    #[arg(long, help = "Print the report as JSON")]
    json: bool,
}

impl PredictArgs {
    fn record(&self) -> RawRecord {
        RawRecord {
            age: self.age,
            hypertension: parse_flag(&self.hypertension),
            heart_disease: parse_flag(&self.heart_disease),
            ever_married: parse_flag(&self.ever_married),
            avg_glucose_level: self.avg_glucose_level,
            bmi: self.bmi,
            residence_type: self.residence_type.as_str().into(),
            gender: self.gender.as_str().into(),
            work_type: self.work_type.as_str().into(),
            smoking_status: self.smoking_status.as_str().into(),
        }
    }
}

#[derive(Args, Debug)]
struct BatchArgs {
    #[arg(short, long, help = "Input CSV of patient records")]
    input: PathBuf,
    #[arg(short, long, help = "Output CSV of predictions")]
    output: PathBuf,
    #[command(flatten)]
    explain: ExplainArgs,
}

#[derive(Debug, PartialEq, Eq, Clone, ValueEnum)]
enum WriteFormat {
    Csv,
    Parquet,
}

#[derive(Args, Debug)]
struct EncodeArgs {
    #[arg(short, long, help = "Input CSV of patient records")]
    input: PathBuf,
    #[arg(short, long, help = "Output path")]
    output: PathBuf,
    #[arg(short, long, value_enum, default_value_t = WriteFormat::Csv, help = "Output format")]
    format: WriteFormat,
}

fn settings(model: PathBuf, explain: &ExplainArgs) -> Result<Settings, StrokeRiskError> {
    let settings = Settings {
        model_path: model,
        top_factors: explain.top,
        explain: !explain.no_explain,
    };
    settings.validate()?;
    Ok(settings)
}

async fn run(cli: StrokeRiskArgs) -> Result<(), StrokeRiskError> {
    match cli.command {
        Command::Predict(args) => {
            let settings = settings(cli.model, &args.explain)?;
            let model = settings.load_model().await?;

            let record = args.record();
            for hint in record.input_hints() {
                warn!("{}", hint);
            }

            let result = score_with(&encode(&record), &model, settings.score_options())?;
            let report = PredictionReport::new(&record, &result);
            if args.json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print!("{}", report);
            }
        }
        Command::Batch(args) => {
            let settings = settings(cli.model, &args.explain)?;
            let model = settings.load_model().await?;

            let records = read_records(&args.input).await?;
            let vectors = encode_all(&records);
            let results = score_batch(&vectors, &model, settings.score_options())?;

            let rows: Vec<PredictionRow> = records
                .iter()
                .zip(&results)
                .enumerate()
                .map(|(i, (record, result))| PredictionRow::new(i, &PredictionReport::new(record, result)))
                .collect();
            let high_risk = rows.iter().filter(|r| r.high_risk).count();
            write_predictions(&args.output, &rows).await?;
            info!(
                "scored {} records ({} high risk) into {}",
                rows.len(),
                high_risk,
                args.output.display()
            );
        }
        Command::Encode(args) => {
            let records = read_records(&args.input).await?;
            let mut df = feature_frame(&encode_all(&records))?;
            match args.format {
                WriteFormat::Csv => write_csv(&args.output, &mut df).await?,
                WriteFormat::Parquet => write_parquet(&args.output, &mut df).await?,
            }
            info!("encoded {} records into {}", df.height(), args.output.display());
        }
    }
    Ok(())
}
