use core::panic;
use std::{fs, path::PathBuf, process::exit};
use subtok::{Metadata, Vocab, VocabKind};

fn main() {
    struct Args {
        metadata: PathBuf,
        prompt: String,
        bos: bool,
        eos: bool,
        ids_only: bool,
    }

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let mut process_args = std::env::args();
    process_args.next().unwrap();
    let mut args = Args {
        metadata: process_args.next().map(PathBuf::from).expect(USAGE_HELP),
        prompt: String::new(),
        bos: false,
        eos: false,
        ids_only: false,
    };
    loop {
        match process_args.next() {
            Some(s) if s == "--prompt" => {
                args.prompt = process_args.next().expect(USAGE_HELP);
            }
            Some(s) if s == "--bos" => args.bos = true,
            Some(s) if s == "--eos" => args.eos = true,
            Some(s) if s == "--ids-only" => args.ids_only = true,
            None => break,
            _ => panic!("{USAGE_HELP}"),
        }
    }

    let text = fs::read_to_string(&args.metadata).unwrap_or_else(|e| {
        eprintln!("{}: {e}", args.metadata.display());
        exit(1);
    });
    let metadata = Metadata::from_json(&text).unwrap_or_else(|e| {
        eprintln!("invalid metadata JSON: {e}");
        exit(1);
    });
    let vocab = Vocab::load(&metadata).unwrap_or_else(|e| {
        eprintln!("{e}");
        exit(1);
    });

    let ids = vocab.tokenize(&args.prompt, args.bos, args.eos);
    if args.ids_only {
        let ids = ids.iter().map(|id| id.to_string()).collect::<Vec<_>>();
        println!("{}", ids.join(" "));
    } else {
        let kind = match vocab.kind() {
            VocabKind::Spm => "spm",
            VocabKind::Bpe => "bpe",
        };
        println!("vocab: {} tokens ({kind})", vocab.vocab_size());
        for &id in &ids {
            println!("{id:>8}  {:?}", vocab.id_to_token(id).unwrap_or("<unmapped>"));
        }
    }
}

const USAGE_HELP: &str = "\
Usage: cargo run <metadata.json> [OPTIONS]
Options:
     --prompt <string>
     --bos
     --eos
     --ids-only
";
