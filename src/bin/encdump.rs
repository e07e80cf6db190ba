// encdump: emit a canned instruction scenario under a chosen configuration and dump the
// finished word stream for inspection. This is the quickest way to eyeball what a width
// and strategy table actually expand to: every word is printed with its index, hex value,
// and primary/extended opcode split, and the session statistics are summarized at the
// end. The scenarios cover the interesting shapes: a straight-line arithmetic kernel, a
// capability-emulated divide, a masked loop with the condition-register reduction, and
// the save/restore bracket.

use bumpalo::Bump;
use clap::Parser;
use log::info;

use rve::core::{
    ArithOp, CodeBuffer, Cond, EncodeError, EncodeResult, EncodingSession, LogicOp, OpFamily,
    Strategy, TargetBackend, TargetConfig, VectorWidth,
};
use rve::core::operand::{Disp, Gpr, MemOperand, Vr};
use rve::ppc::{word, PpcBackend};

#[derive(Parser)]
#[command(
    name = "encdump",
    about = "Emit and dump RVE instruction streams for inspection"
)]
struct Args {
    /// Logical vector width in bits (128, 256, or 512)
    #[arg(long, default_value_t = 256)]
    width: u32,

    /// Strategy for the divide and square-root families (refine | fallback)
    #[arg(long, default_value = "refine")]
    strategy: String,

    /// Scenario to emit (kernel | divide | loop | bracket)
    #[arg(long, default_value = "kernel")]
    scenario: String,

    /// Dump raw big-endian bytes instead of decoded words
    #[arg(long)]
    bytes: bool,
}

fn parse_width(bits: u32) -> EncodeResult<VectorWidth> {
    match bits {
        128 => Ok(VectorWidth::W128),
        256 => Ok(VectorWidth::W256),
        512 => Ok(VectorWidth::W512),
        _ => Err(EncodeError::UnsupportedWidth {
            family: "ppc-vmx",
            width: bits,
        }),
    }
}

fn parse_strategy(name: &str) -> Result<Strategy, String> {
    match name {
        "refine" => Ok(Strategy::Refine),
        "fallback" => Ok(Strategy::ScalarFallback),
        other => Err(format!("unknown strategy '{other}' (refine | fallback)")),
    }
}

fn emit_scenario(
    backend: &PpcBackend,
    session: &EncodingSession,
    scenario: &str,
) -> Result<CodeBuffer, String> {
    let mut buf = CodeBuffer::new();
    match scenario {
        "kernel" => {
            backend.emit_load(&mut buf, Vr::V0, MemOperand::offset(Gpr::G1), Disp::ZERO);
            backend.emit_load(&mut buf, Vr::V1, MemOperand::offset(Gpr::G1), Disp(64));
            backend.emit_arith(&mut buf, ArithOp::Add, Vr::V2, Vr::V0, Vr::V1);
            backend.emit_arith(&mut buf, ArithOp::Mul, Vr::V3, Vr::V2, Vr::V0);
            backend.emit_fma(&mut buf, Vr::V4, Vr::V3, Vr::V1, Vr::V2);
            backend.emit_store(&mut buf, Vr::V4, MemOperand::offset(Gpr::G2), Disp::ZERO);
        }
        "divide" => {
            backend.emit_load(&mut buf, Vr::V0, MemOperand::offset(Gpr::G1), Disp::ZERO);
            backend.emit_load(&mut buf, Vr::V1, MemOperand::offset(Gpr::G1), Disp(64));
            backend.emit_div(&mut buf, Vr::V2, Vr::V0, Vr::V1);
            backend.emit_sqrt(&mut buf, Vr::V3, Vr::V2);
            backend.emit_store(&mut buf, Vr::V3, MemOperand::offset(Gpr::G2), Disp::ZERO);
        }
        "loop" => {
            let top = buf.create_label();
            let done = buf.create_label();
            session.name_label(0, "loop_top");
            session.name_label(1, "loop_done");
            buf.bind_label(top);
            session.record_label_bound();
            backend.emit_load(&mut buf, Vr::V0, MemOperand::indexed(Gpr::G1, Gpr::G3), Disp::ZERO);
            backend.emit_lanes_eq(&mut buf, Vr::V5, Vr::V0, Vr::V1);
            backend.emit_branch_all_true(&mut buf, Vr::V5, done);
            backend.emit_arith(&mut buf, ArithOp::Sub, Vr::V0, Vr::V0, Vr::V1);
            backend.emit_logic(&mut buf, LogicOp::Xor, Vr::V4, Vr::V4, Vr::V0);
            // Advance the index by the stride in G2, then loop while short of
            // the limit in G4.
            backend.emit_scalar_arith(&mut buf, ArithOp::Add, Gpr::G3, Gpr::G3, Gpr::G2);
            backend.emit_cmp_branch(&mut buf, Cond::Lt, Gpr::G3, Gpr::G4, top);
            buf.bind_label(done);
            session.record_label_bound();
        }
        "bracket" => {
            backend.emit_enter(&mut buf, Gpr::G0);
            backend.emit_arith(&mut buf, ArithOp::Add, Vr::V2, Vr::V0, Vr::V1);
            backend.emit_leave(&mut buf, Gpr::G0);
        }
        other => return Err(format!("unknown scenario '{other}' (kernel | divide | loop | bracket)")),
    }
    Ok(buf)
}

fn dump_words(words: &[u32]) {
    for (i, w) in words.iter().enumerate() {
        let opcd = word::decode_opcd(*w);
        let ext = match opcd {
            31 => format!(" x-xo={}", word::decode_x_xo(*w)),
            4 => format!(" vx-xo={}", word::decode_vx_xo(*w)),
            59 | 63 => format!(" fp-xo={}", word::decode_x_xo(*w)),
            _ => String::new(),
        };
        println!("{i:4}: {w:#010X}  opcd={opcd}{ext}");
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args = Args::parse();

    let width = parse_width(args.width)?;
    let strategy = parse_strategy(&args.strategy)?;
    let config = TargetConfig::new(width)
        .with_strategy(OpFamily::Div, strategy)
        .with_strategy(OpFamily::Sqrt, strategy);

    let arena = Bump::new();
    let session = EncodingSession::new(&arena);
    let backend = PpcBackend::new(config)?.with_session(&session);
    info!(
        "width={} strategy={:?} features={:#010b}",
        args.width,
        strategy,
        backend.features()
    );

    let buf = emit_scenario(&backend, &session, &args.scenario)?;
    let words = buf.finalize()?;

    if args.bytes {
        for chunk in CodeBuffer::to_be_bytes(&words).chunks(16) {
            let hex: Vec<String> = chunk.iter().map(|b| format!("{b:02x}")).collect();
            println!("{}", hex.join(" "));
        }
    } else {
        dump_words(&words);
    }

    let stats = session.stats();
    println!(
        "-- {} words ({} resolver aux), {} branches, {} labels bound",
        stats.words_emitted, stats.aux_words, stats.branches, stats.labels_bound
    );
    Ok(())
}
