use anyhow::Context;
use clap::{ArgAction, Parser};
use mp4remux::{
    decode::read_avcc,
    default_registry, dump_atoms, atom_tree, read_nalus,
    registry::Record,
    util::{hex_dump, read_slice},
    AtomWalker, FourCC, NaluKind, ParseError,
};
use std::fs::File;
use std::io::BufReader;

#[derive(Parser, Debug)]
#[command(version, about = "Walk, decode and inspect ISO-BMFF files")]
struct Args {
    /// MP4/ISOBMFF file path
    path: String,

    /// Locate the first atom of this 4CC with the lazy walker (e.g. --find tkhd)
    #[arg(long)]
    find: Option<String>,

    /// Print typed records when a decoder exists
    #[arg(long, action = ArgAction::SetTrue)]
    decode: bool,

    /// Emit JSON instead of human-readable output
    #[arg(long, action = ArgAction::SetTrue)]
    json: bool,

    /// List the first N NAL units of the first mdat
    #[arg(long, value_name = "N")]
    nalus: Option<usize>,

    /// Classify NAL units as H.265 instead of H.264
    #[arg(long, action = ArgAction::SetTrue)]
    h265: bool,

    /// Limit depth of the text tree
    #[arg(long, default_value_t = 64)]
    max_depth: usize,

    /// Hex dump the payload of the atom selected with --find
    #[arg(long, action = ArgAction::SetTrue)]
    raw: bool,

    /// Bytes to dump with --raw (0 means entire payload)
    #[arg(long, default_value_t = 0)]
    bytes: u64,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();
    let file = File::open(&args.path).with_context(|| format!("opening {}", args.path))?;
    let len = file.metadata()?.len();
    let mut walker = AtomWalker::with_len(BufReader::new(file), len);

    match &args.find {
        Some(tag) => find_atom(&mut walker, tag, &args)?,
        None => print_tree(&mut walker, len, &args)?,
    }

    if let Some(n) = args.nalus {
        list_nalus(&mut walker, n, &args)?;
    }
    Ok(())
}

// ---------- Tree ----------

fn print_tree(walker: &mut AtomWalker<BufReader<File>>, len: u64, args: &Args) -> anyhow::Result<()> {
    let r = walker.reader_mut();
    if args.json {
        let tree = atom_tree(r, len, args.decode)?;
        println!("{}", serde_json::to_string_pretty(&tree)?);
    } else {
        print!("{}", dump_atoms(r, len, args.max_depth)?);
    }
    Ok(())
}

// ---------- Single atom ----------

fn find_atom(walker: &mut AtomWalker<BufReader<File>>, tag: &str, args: &Args) -> anyhow::Result<()> {
    let typ = FourCC::from_str(tag).with_context(|| format!("'{tag}' is not a 4-character code"))?;
    let id = walker.locate_node(&typ.0)?.ok_or(ParseError::NotFound(typ))?;
    let atom = *walker.atom(id);
    println!(
        "{} at {:#x}, {} bytes (path {})",
        atom.typ,
        atom.header_offset(),
        atom.range.total_length(),
        walker.path(id)
    );

    if args.decode {
        match default_registry().decode(walker.reader_mut(), &atom) {
            Some(rec) => print_record(&rec?, args.json)?,
            None => println!("  no decoder for '{}'", atom.typ),
        }
    }

    if args.raw {
        let to_read = if args.bytes == 0 { atom.content_length() } else { args.bytes.min(atom.content_length()) };
        let data = read_slice(walker.reader_mut(), atom.content_offset(), to_read)?;
        print!("{}", hex_dump(&data, atom.content_offset()));
    }
    Ok(())
}

fn print_record(rec: &Record, json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(rec)?);
        return Ok(());
    }
    println!("{rec:#?}");
    if let Record::AvcDecoderConfig(avcc) = rec {
        println!("  sps: {}", hex::encode(&avcc.sps));
        println!("  pps: {}", hex::encode(&avcc.pps));
    }
    Ok(())
}

// ---------- NAL units ----------

fn list_nalus(walker: &mut AtomWalker<BufReader<File>>, n: usize, args: &Args) -> anyhow::Result<()> {
    let kind = if args.h265 { NaluKind::H265 } else { NaluKind::H264 };
    let length_size = match walker.locate(b"avcC")? {
        Some(avcc) => read_avcc(walker.reader_mut(), &avcc)?.nalu_length_size as usize,
        None => 4,
    };
    let mdat = walker.require(b"mdat")?;
    let nalus = read_nalus(walker.reader_mut(), &mdat.range, length_size, kind)?;
    for nalu in nalus.iter().take(n) {
        println!(
            "{:#010x} {:>8} {:>2} {:<24}{}{}",
            nalu.range.header_offset(),
            nalu.range.content_length,
            nalu.typ,
            nalu.describe_type(),
            if nalu.is_keyframe() { " key" } else { "" },
            if nalu.is_parameter_set() { " param" } else { "" },
        );
    }
    println!("{} of {} NAL units", nalus.len().min(n), nalus.len());
    Ok(())
}
