use std::io;
use std::path::Path;

#[allow(dead_code)]
#[path = "../session.rs"]
mod session;

use session::{Session, TranscriptProfile};
use trigger_core::clock::ManualClock;

fn main() -> io::Result<()> {
    for profile in TranscriptProfile::ALL {
        record_profile(profile)?;
        println!("recorded {}", profile.log_path());
    }
    Ok(())
}

fn record_profile(profile: TranscriptProfile) -> io::Result<()> {
    let path = profile.log_path();
    let mut session = Session::new(
        profile.variant(),
        ManualClock::starting_at(profile.clock_offset()),
    )
    .with_transcript(Path::new(&path), profile.header())?;

    match profile {
        TranscriptProfile::Normal => record_normal(&mut session),
        TranscriptProfile::AutoStop => record_auto_stop(&mut session),
        TranscriptProfile::UnoUnsupported => record_uno(&mut session),
        TranscriptProfile::Wraparound => record_wraparound(&mut session),
    }
}

fn record_normal(session: &mut Session<ManualClock>) -> io::Result<()> {
    session.handle_line("?")?;
    session.handle_line("DT250")?;
    session.handle_line("s")?;
    session.run_for(1_100)?;
    session.handle_line("?")?;
    session.handle_line("s")?;
    session.run_for(500)?;
    Ok(())
}

fn record_auto_stop(session: &mut Session<ManualClock>) -> io::Result<()> {
    session.handle_line("DT100")?;
    session.handle_line("T450")?;
    session.handle_line("s")?;
    session.run_for(600)?;
    session.handle_line("?")?;
    Ok(())
}

fn record_uno(session: &mut Session<ManualClock>) -> io::Result<()> {
    session.handle_line("T1000")?;
    session.handle_line("?")?;
    session.handle_line("dt50")?;
    session.handle_line("s")?;
    session.run_for(120)?;
    session.handle_line("s")?;
    Ok(())
}

fn record_wraparound(session: &mut Session<ManualClock>) -> io::Result<()> {
    session.handle_line("DT500")?;
    session.handle_line("s")?;
    session.run_for(3_000)?;
    session.handle_line("s")?;
    Ok(())
}
