use anyhow::{bail, Context, Result};
use clap::Parser as ClapParser;
use eevm_core::{DecodedInstruction, Decoder, Hasher, Keccak256, Keccak256Hasher};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};

mod config;

use config::DisassemblerConfig;

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct Inst {
    address: usize,
    mnemonic: String,
    operands: Vec<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    truncated: bool,
}

impl Inst {
    pub fn from_decoded(inst: &DecodedInstruction) -> Self {
        Self {
            address: inst.offset(),
            mnemonic: inst.mnemonic().into_owned(),
            operands: inst
                .immediate()
                .map(|imm| vec![format!("0x{}", hex::encode(imm))])
                .unwrap_or_default(),
            truncated: inst.is_truncated(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Listing {
    code_hash: Keccak256,
    size: usize,
    instructions: Vec<Inst>,
}

pub struct Disassembler {
    code: Vec<u8>,
    strict: bool,
    insts: Vec<DecodedInstruction>,
}

impl Disassembler {
    pub fn new(code: Vec<u8>, strict: bool) -> Self {
        Self {
            code,
            strict,
            insts: Vec::new(),
        }
    }

    pub fn from_path(path: impl AsRef<Path>, strict: bool) -> Result<Self> {
        Ok(Self::new(load_code(path)?, strict))
    }

    pub fn get_insts(&self) -> &[DecodedInstruction] {
        &self.insts
    }

    pub fn code_hash(&self) -> Keccak256 {
        Keccak256Hasher.hash(&self.code)
    }

    pub fn disassemble(&mut self) -> Result<()> {
        self.insts.clear();
        for inst in Decoder::new(&self.code) {
            if !inst.is_known() {
                if self.strict {
                    bail!("unknown opcode {:#04x} at offset {:#x}", inst.code(), inst.offset());
                }
                log::warn!("unknown opcode {:#04x} at offset {:#x}", inst.code(), inst.offset());
            }
            if inst.is_truncated() {
                log::warn!(
                    "{} at offset {:#x} runs past the end of the code ({} of {} bytes)",
                    inst.mnemonic(),
                    inst.offset(),
                    inst.encoded_len() - 1,
                    inst.nominal_immediate_len()
                );
            }
            self.insts.push(inst);
        }
        log::info!("decoded {} instructions from {} bytes", self.insts.len(), self.code.len());
        Ok(())
    }

    pub fn print_insts(&self, mut writer: impl Write, show_hash: bool) -> Result<()> {
        for inst in &self.insts {
            writeln!(writer, "{}", inst)?;
        }
        if show_hash {
            writeln!(writer, "code hash: {}", self.code_hash())?;
        }
        Ok(())
    }

    pub fn write_insts(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let listing = Listing {
            code_hash: self.code_hash(),
            size: self.code.len(),
            instructions: self.insts.iter().map(Inst::from_decoded).collect(),
        };
        let mut writer = std::fs::File::create(path)
            .with_context(|| format!("creating {}", path.display()))?;
        serde_yaml::to_writer(&mut writer, &listing)?;
        Ok(())
    }
}

/// Parse hex text into code. Whitespace is ignored and a `0x` prefix is optional.
pub fn parse_hex_code(text: &str) -> Result<Vec<u8>> {
    let text = text.trim();
    let text = text
        .strip_prefix("0x")
        .or_else(|| text.strip_prefix("0X"))
        .unwrap_or(text);
    let digits: String = text.chars().filter(|c| !c.is_whitespace()).collect();
    if digits.len() % 2 != 0 {
        bail!("hex code has an odd number of digits ({})", digits.len());
    }
    Ok(hex::decode(&digits)?)
}

fn looks_like_hex(text: &str) -> bool {
    let text = text.trim();
    let text = text
        .strip_prefix("0x")
        .or_else(|| text.strip_prefix("0X"))
        .unwrap_or(text);
    !text.is_empty() && text.chars().all(|c| c.is_ascii_hexdigit() || c.is_whitespace())
}

/// Read code from a file holding either hex text or raw bytes.
///
/// Text that looks like hex but does not decode is kept as raw bytes.
pub fn load_code(path: impl AsRef<Path>) -> Result<Vec<u8>> {
    let path = path.as_ref();
    let bytes = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    match std::str::from_utf8(&bytes) {
        Ok(text) if looks_like_hex(text) => {
            match parse_hex_code(text) {
                Ok(code) => {
                    log::debug!("{} holds hex text", path.display());
                    Ok(code)
                }
                Err(e) => {
                    log::debug!("{} is not valid hex ({}), reading raw bytes", path.display(), e);
                    Ok(bytes)
                }
            }
        }
        _ => Ok(bytes),
    }
}

/// Disassemble EVM bytecode
#[derive(ClapParser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// file with raw or hex-encoded code
    #[arg(short, long, required_unless_present = "hex", conflicts_with = "hex")]
    input: Option<PathBuf>,
    /// hex-encoded code given directly
    #[arg(long)]
    hex: Option<String>,
    /// write a YAML listing here
    #[arg(short, long)]
    output: Option<PathBuf>,
    /// fail on unrecognized opcodes
    #[arg(short, long)]
    strict: bool,
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// do not print the code hash
    #[arg(long)]
    no_hash: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    let config = match &args.config {
        Some(path) => DisassemblerConfig::load(path)?,
        None => DisassemblerConfig::default(),
    };
    env_logger::Builder::new()
        .filter_level(config.log_level)
        .parse_default_env()
        .init();

    let strict = args.strict || config.strict;
    let mut disassembler = match (&args.input, &args.hex) {
        (Some(path), _) => Disassembler::from_path(path, strict)?,
        (None, Some(text)) => Disassembler::new(parse_hex_code(text)?, strict),
        (None, None) => bail!("either --input or --hex is required"),
    };
    disassembler.disassemble()?;
    disassembler.print_insts(std::io::stdout().lock(), config.show_hash && !args.no_hash)?;
    if let Some(output) = &args.output {
        disassembler.write_insts(output)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("eevm-disassembler-{}-{}", std::process::id(), name))
    }

    #[test]
    fn args_are_consistent() {
        Args::command().debug_assert();
    }

    #[test]
    fn hex_text() {
        assert_eq!(parse_hex_code("0x6001 6002\n01").unwrap(), vec![0x60, 0x01, 0x60, 0x02, 0x01]);
        assert_eq!(parse_hex_code("").unwrap(), Vec::<u8>::new());
        assert!(parse_hex_code("600").is_err());
        assert!(parse_hex_code("60zz").is_err());
    }

    #[test]
    fn load_hex_and_raw_files() -> Result<()> {
        let hex_path = temp_path("code.hex");
        std::fs::write(&hex_path, "0x60016002\n01\n")?;
        assert_eq!(load_code(&hex_path)?, vec![0x60, 0x01, 0x60, 0x02, 0x01]);

        let raw_path = temp_path("code.bin");
        std::fs::write(&raw_path, [0x60, 0x01, 0xfe])?;
        assert_eq!(load_code(&raw_path)?, vec![0x60, 0x01, 0xfe]);

        std::fs::remove_file(hex_path)?;
        std::fs::remove_file(raw_path)?;
        Ok(())
    }

    #[test]
    fn load_upper_prefix_and_odd_hex_like_files() -> Result<()> {
        let upper_path = temp_path("upper.hex");
        std::fs::write(&upper_path, "0X6001
")?;
        assert_eq!(load_code(&upper_path)?, vec![0x60, 0x01]);

        // hex digits only, but an odd count: read as raw bytes
        let odd_path = temp_path("odd.bin");
        std::fs::write(&odd_path, b"abc")?;
        assert_eq!(load_code(&odd_path)?, b"abc".to_vec());

        std::fs::remove_file(upper_path)?;
        std::fs::remove_file(odd_path)?;
        Ok(())
    }

    #[test]
    fn print_listing() -> Result<()> {
        let mut disassembler = Disassembler::new(vec![0x60, 0x01, 0x60, 0x02, 0x01], false);
        disassembler.disassemble()?;
        let mut out = Vec::new();
        disassembler.print_insts(&mut out, false)?;
        assert_eq!(
            String::from_utf8(out)?,
            "0x0000  PUSH1  0x01\n0x0002  PUSH1  0x02\n0x0004  ADD\n"
        );
        Ok(())
    }

    #[test]
    fn print_hash() -> Result<()> {
        let mut disassembler = Disassembler::new(Vec::new(), false);
        disassembler.disassemble()?;
        let mut out = Vec::new();
        disassembler.print_insts(&mut out, true)?;
        assert_eq!(
            String::from_utf8(out)?,
            "code hash: 0xc5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470\n"
        );
        Ok(())
    }

    #[test]
    fn strict_rejects_unknown() {
        let mut disassembler = Disassembler::new(vec![0x00, 0xfe], true);
        let err = disassembler.disassemble().unwrap_err();
        assert_eq!(err.to_string(), "unknown opcode 0xfe at offset 0x1");

        let mut lenient = Disassembler::new(vec![0x00, 0xfe], false);
        lenient.disassemble().unwrap();
        assert_eq!(lenient.get_insts().len(), 2);
    }

    #[test]
    fn strict_accepts_truncated_push() {
        let mut disassembler = Disassembler::new(vec![0x61, 0xaa], true);
        disassembler.disassemble().unwrap();
        assert!(disassembler.get_insts()[0].is_truncated());
    }

    #[test]
    fn yaml_listing() -> Result<()> {
        let mut disassembler = Disassembler::new(vec![0x5b, 0x61, 0xaa], false);
        disassembler.disassemble()?;
        let path = temp_path("out").join("listing.yaml");
        disassembler.write_insts(&path)?;

        let text = std::fs::read_to_string(&path)?;
        assert!(text.contains("code_hash:"));
        assert!(text.contains("size: 3"));
        assert!(text.contains("instructions:"));
        assert!(!text.contains("insts:"));

        let listing: Listing = serde_yaml::from_str(&text)?;
        assert_eq!(listing.size, 3);
        assert_eq!(listing.code_hash, Keccak256::digest(&[0x5b, 0x61, 0xaa]));
        assert_eq!(
            listing.instructions,
            vec![
                Inst {
                    address: 0,
                    mnemonic: "JUMPDEST".to_string(),
                    operands: vec![],
                    truncated: false,
                },
                Inst {
                    address: 1,
                    mnemonic: "PUSH2".to_string(),
                    operands: vec!["0xaa".to_string()],
                    truncated: true,
                },
            ]
        );

        std::fs::remove_dir_all(temp_path("out"))?;
        Ok(())
    }
}
