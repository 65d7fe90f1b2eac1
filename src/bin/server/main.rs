//! PP-OCRv3 serving binary.
//!
//! Builds the detection/classification/recognition pipeline from the
//! stage model directories given on the command line, then serves it over
//! HTTP on port 18080.
//!
//! # Usage
//!
//! ```bash
//! ppocr-serve ./ch_PP-OCRv3_det_infer ./ch_ppocr_mobile_v2.0_cls_infer \
//!     ./ch_PP-OCRv3_rec_infer ./ppocr_keys_v1.txt 0
//! ```
//!
//! The run option selects the device and backend: 0-3 run on the CPU
//! (native, OpenVINO, ONNX Runtime, lite), 4-7 on the GPU (native,
//! native+TRT, ONNX Runtime, pure TRT).

mod ocr;
mod server;

use clap::Parser;
use ppocr_serve::pipeline::PipelineBuilder;
use ppocr_serve::utils::init_tracing;
use ppocr_serve::RuntimeOption;
use std::path::PathBuf;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "ppocr-serve")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Serve the PP-OCRv3 pipeline over HTTP", long_about = None)]
struct Cli {
    /// Directory of the text detection model
    det_model_dir: PathBuf,

    /// Directory of the orientation classification model
    cls_model_dir: PathBuf,

    /// Directory of the text recognition model
    rec_model_dir: PathBuf,

    /// Character label map consumed by the recognizer
    rec_label_file: PathBuf,

    /// Run option selecting device and backend (0-7)
    flag: i32,

    /// Historical single-shot image path; ignored by the serving build
    #[allow(dead_code)]
    image_path: Option<String>,
}

fn usage_banner() {
    println!(
        "Usage: ppocr-serve path/to/det_model path/to/cls_model path/to/rec_model \
         path/to/rec_label_file run_option, \
         e.g ./ppocr-serve ./ch_PP-OCRv3_det_infer ./ch_ppocr_mobile_v2.0_cls_infer \
         ./ch_PP-OCRv3_rec_infer ./ppocr_keys_v1.txt 0"
    );
    println!(
        "The data type of run_option is int, e.g. 0: run with native inference on cpu; \
         7: run with TensorRT on gpu."
    );
}

#[tokio::main]
async fn main() {
    init_tracing();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e)
            if matches!(
                e.kind(),
                clap::error::ErrorKind::DisplayHelp | clap::error::ErrorKind::DisplayVersion
            ) =>
        {
            let _ = e.print();
            std::process::exit(0);
        }
        Err(_) => {
            usage_banner();
            std::process::exit(-1);
        }
    };

    let option = RuntimeOption::from_flag(cli.flag);
    info!(flag = cli.flag, "building OCR pipeline");

    let pipeline = match PipelineBuilder::new(
        &cli.det_model_dir,
        &cli.rec_model_dir,
        &cli.rec_label_file,
    )
    .with_classifier(&cli.cls_model_dir)
    .runtime_option(option)
    .build()
    {
        Ok(pipeline) => pipeline,
        Err(e) => {
            error!("failed to initialize OCR pipeline: {e}");
            std::process::exit(1);
        }
    };

    if let Err(e) = server::run_server(pipeline).await {
        error!("server error: {e}");
        std::process::exit(1);
    }
}
