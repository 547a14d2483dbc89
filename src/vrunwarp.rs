// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright © 2023 Adrian <adrian.eddy at gmail>

use std::io::{ Read, Write };
use std::time::Instant;

use argh::FromArgs;
use indicatif::{ ProgressBar, ProgressStyle };

use vrunwarp::WarpManager;
use vrunwarp::device_profile::Device;
use vrunwarp::error::{ Result, WarpError };
use vrunwarp::pixel_format::PixelFormat;
use vrunwarp::profile_reader::JsonProfileReader;

/** vrunwarp v1.2.0
Reverses VR headset lens distortion and chromatic aberration in raw video frames
*/
#[derive(FromArgs)]
struct Opts {
    /// input raw video file, "-" for stdin
    #[argh(positional)]
    input: String,

    /// output raw video file
    #[argh(positional)]
    output: String,

    /// input frame size as WxH, eg. "1920x1080"
    #[argh(option)]
    input_size: String,

    /// output frame size as WxH, defaults to the input size
    #[argh(option)]
    output_size: Option<String>,

    /// output width, alternative to --output-size
    #[argh(option)]
    width: Option<usize>,

    /// output height, alternative to --output-size
    #[argh(option)]
    height: Option<usize>,

    /// pixel format: rgb24, bgr24, rgba or bgra, default: rgb24
    #[argh(option, default = "String::from(\"rgb24\")")]
    format: String,

    /// headset: RiftDK1 or RiftDK2, default: RiftDK2
    #[argh(option, default = "String::from(\"RiftDK2\")")]
    device: String,

    /// SDK version the footage was rendered with, eg. "0.4.4", default: first supported
    #[argh(option, default = "String::from(\"default\")")]
    sdk_version: String,

    /// eye relief dial position 0-10, default: read from the profile file
    #[argh(option, default = "-1")]
    eye_relief: i32,

    /// path to a JSON user profile file with per-device eye relief settings
    #[argh(option)]
    profile: Option<String>,

    /// fail when the eye relief can't be read from the profile instead of assuming 3
    #[argh(switch)]
    strict_profile: bool,

    /// apply the distortion instead of removing it (prepare flat footage for the headset)
    #[argh(switch)]
    forward: bool,

    /// source pixels per degree of view for --forward, default: 10
    #[argh(option, default = "0.0")]
    ppd: f32,

    /// input is a single full-width view instead of side-by-side
    #[argh(switch)]
    mono_input: bool,

    /// swap the left and right source eyes
    #[argh(switch)]
    swap_eyes: bool,

    /// only render the left eye, leave the right half black
    #[argh(switch)]
    left_eye_only: bool,

    /// output zoom factor, horizontal
    #[argh(option, default = "1.0")]
    scale_width: f32,

    /// output zoom factor, vertical
    #[argh(option, default = "1.0")]
    scale_height: f32,

    /// input zoom factor, horizontal
    #[argh(option, default = "1.0")]
    scale_in_width: f32,

    /// input zoom factor, vertical
    #[argh(option, default = "1.0")]
    scale_in_height: f32,

    /// verbose logging
    #[argh(switch, short = 'v')]
    verbose: bool,
}

fn parse_size(s: &str) -> Result<(usize, usize)> {
    let err = || WarpError::InvalidGeometry(format!("expected WxH, got {s:?}"));
    let (w, h) = s.split_once('x').ok_or_else(err)?;
    Ok((w.parse().map_err(|_| err())?, h.parse().map_err(|_| err())?))
}

fn run(opts: Opts) -> Result<()> {
    let format: PixelFormat = opts.format.parse()?;
    let bpp = format.bytes_per_pixel();

    let (in_w, in_h) = parse_size(&opts.input_size)?;
    let (out_w, out_h) = match (&opts.output_size, opts.width, opts.height) {
        (Some(_), Some(_), _) | (Some(_), _, Some(_)) => {
            return Err(WarpError::ConflictingSizeOptions("--output-size together with --width/--height"));
        }
        (Some(s), None, None) => parse_size(s)?,
        (None, w, h) => (w.unwrap_or(in_w), h.unwrap_or(in_h)),
    };

    let mgr = WarpManager::default();
    {
        let mut cfg = mgr.config.write();
        cfg.device = opts.device.parse::<Device>()?;
        cfg.sdk_version = opts.sdk_version.clone();
        cfg.eye_relief_dial = opts.eye_relief;
        cfg.strict_profile = opts.strict_profile;
        cfg.forward_warp = opts.forward;
        cfg.ppd = opts.ppd;
        cfg.mono_input = opts.mono_input;
        cfg.swap_eyes = opts.swap_eyes;
        cfg.left_eye_only = opts.left_eye_only;
        cfg.scale_width = opts.scale_width;
        cfg.scale_height = opts.scale_height;
        cfg.scale_in_width = opts.scale_in_width;
        cfg.scale_in_height = opts.scale_in_height;
    }
    if let Some(path) = &opts.profile {
        mgr.set_profile_reader(Box::new(JsonProfileReader::new(path)));
    }
    mgr.init_size((in_w, in_h, in_w * bpp), (out_w, out_h, out_w * bpp), format);

    let build_start = Instant::now();
    mgr.recompute_blocking()?;
    log::info!("Mapping cache for {in_w}x{in_h} -> {out_w}x{out_h} built in {:.3}s", build_start.elapsed().as_secs_f64());

    let frame_in = in_w * in_h * bpp;
    let frame_out = out_w * out_h * bpp;

    let mut reader: Box<dyn Read> = if opts.input == "-" {
        Box::new(std::io::stdin().lock())
    } else {
        Box::new(std::io::BufReader::new(std::fs::File::open(&opts.input)?))
    };
    let mut writer = std::io::BufWriter::new(std::fs::File::create(&opts.output)?);

    // A regular file with a known length gives us a frame count for the bar
    let pb = match std::fs::metadata(&opts.input) {
        Ok(m) if opts.input != "-" && m.is_file() => {
            let pb = ProgressBar::new(m.len() / frame_in as u64);
            pb.set_style(ProgressStyle::with_template("[{bar:50.cyan/blue}] {pos:>5}/{len:5} {eta:11}").unwrap().progress_chars("#>-"));
            pb
        }
        _ => ProgressBar::hidden(),
    };

    let mut input = vec![0u8; frame_in];
    let mut output = vec![0u8; frame_out];
    let mut frames = 0u64;
    let start = Instant::now();
    loop {
        match read_frame(&mut reader, &mut input)? {
            FrameRead::Full => {}
            FrameRead::Eof => break,
            FrameRead::Short(n) => {
                log::warn!("Trailing {n} bytes don't make a full frame, stopping");
                break;
            }
        }
        if !mgr.process_pixels(&input, &mut output) {
            return Err(WarpError::InvalidGeometry("frame doesn't match the configured sizes".into()));
        }
        writer.write_all(&output)?;
        frames += 1;
        pb.inc(1);
    }
    writer.flush()?;
    pb.finish_and_clear();
    log::info!("Processed {frames} frames in {:.3}s", start.elapsed().as_secs_f64());
    Ok(())
}

enum FrameRead {
    Full,
    Eof,
    Short(usize),
}

fn read_frame(reader: &mut dyn Read, buf: &mut [u8]) -> Result<FrameRead> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => return Ok(if filled == 0 { FrameRead::Eof } else { FrameRead::Short(filled) }),
            Ok(n) => filled += n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e.into()),
        }
    }
    Ok(FrameRead::Full)
}

fn main() {
    let opts: Opts = argh::from_env();
    let level = if opts.verbose { log::LevelFilter::Debug } else { log::LevelFilter::Info };
    let _ = simplelog::TermLogger::init(level, simplelog::Config::default(), simplelog::TerminalMode::Mixed, simplelog::ColorChoice::Auto);

    if let Err(e) = run(opts) {
        log::error!("{e}");
        std::process::exit(1);
    }
}
