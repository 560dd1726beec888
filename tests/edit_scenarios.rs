use std::sync::Arc;

use egui::{Modifiers, PointerButton, pos2};
use pianogrid::axis::{PitchAxis, TickAxis};
use pianogrid::config::EditorConfig;
use pianogrid::input::{EditCommand, PianoTool};
use pianogrid::messages::{PartEvent, drain};
use pianogrid::model::{Note, Part, PartProvider};
use pianogrid::operation::{OperationKind, PointerInput};
use pianogrid::time_utils::TempoTrack;
use pianogrid::view::ViewState;
use pianogrid::waveform::WaveformSampler;
use pianogrid::{Invalidation, PianoGrid};

fn setup(notes: &[(f64, f64, i32)]) -> (PianoGrid, ViewState, PartProvider) {
    let _ = env_logger::builder().is_test(true).try_init();
    let config = EditorConfig::default();
    let mut view = ViewState::new(1000.0, 600.0, &config);
    view.tick_axis = TickAxis::new(0.0, 0.25, 1000.0);
    view.pitch_axis = PitchAxis::new(72.0, 10.0, 600.0);

    let mut part = Part::new("verse", 0.0, 8000.0, Arc::new(TempoTrack::default()));
    for &(pos, dur, pitch) in notes {
        part.insert_note(Note::new(pos, dur, pitch, "a"));
    }
    let mut provider = PartProvider::new();
    let mut grid = PianoGrid::new(config);
    grid.attach(&view, &provider);
    provider.replace(Some(part));
    grid.poll(&mut view, provider.get_mut());
    (grid, view, provider)
}

fn press(x: f32, y: f32) -> PointerInput {
    PointerInput::new(pos2(x, y), Modifiers::NONE, PointerButton::Primary)
}

#[test]
fn copy_range_and_paste_elsewhere() {
    let (mut grid, mut view, mut provider) =
        setup(&[(480.0, 480.0, 60), (960.0, 480.0, 62), (1440.0, 480.0, 64)]);
    grid.selection_mut().activate(480.0, 1440.0);
    assert!(grid.execute(EditCommand::Copy, provider.get_mut(), &mut view));

    let part = provider.get_mut().unwrap();
    let events = part.events().subscribe();
    let mut editor = grid.bind(part, &view);
    assert!(editor.paste_at(2000.0));

    let pasted: Vec<(f64, i32)> = part
        .notes()
        .iter()
        .filter(|n| n.pos >= 2000.0)
        .map(|n| (n.pos, n.pitch))
        .collect();
    assert_eq!(pasted, vec![(2000.0, 60), (2480.0, 62)]);
    assert_eq!(part.commit_count(), 1);

    let (received, _) = drain(&events);
    let commits = received.iter().filter(|e| **e == PartEvent::Committed).count();
    assert_eq!(commits, 1);
}

#[test]
fn octave_round_trip_and_silent_zero_shift() {
    let (mut grid, mut view, mut provider) = setup(&[(0.0, 480.0, 60), (480.0, 480.0, 67)]);
    assert!(grid.execute(EditCommand::SelectAll, provider.get_mut(), &mut view));
    assert!(grid.execute(EditCommand::OctaveUp, provider.get_mut(), &mut view));
    assert!(grid.execute(EditCommand::OctaveDown, provider.get_mut(), &mut view));
    let part = provider.get_mut().unwrap();
    let pitches: Vec<i32> = part.notes().iter().map(|n| n.pitch).collect();
    assert_eq!(pitches, vec![60, 67]);

    let events = part.events().subscribe();
    let commits = part.commit_count();
    assert!(!grid.bind(part, &view).change_key(0));
    assert!(drain(&events).0.is_empty());
    assert_eq!(part.commit_count(), commits);
}

#[test]
fn waveform_strip_mapping() {
    let axis = TickAxis::new(0.0, 0.25, 1000.0);
    let sampler = WaveformSampler::new(&axis, 200.0, 100.0);
    assert_eq!(sampler.top(), 100.0);
    assert_eq!(sampler.value_to_y(0.0, 1.0), 150.0);
    assert_eq!(sampler.value_to_y(1.0, 1.0), 100.0);
    assert_eq!(sampler.value_to_y(0.5, 2.0), 100.0);
    assert_eq!(sampler.value_to_y(-1.0, 1.0), 200.0);
}

#[test]
fn drag_is_idempotent_and_single_at_a_time() {
    let (mut grid, mut view, mut provider) = setup(&[(480.0, 480.0, 60), (1440.0, 480.0, 62)]);
    let part = provider.get_mut().unwrap();

    assert_eq!(grid.pointer_down(part, &mut view, &press(170.0, 115.0)), Some(OperationKind::NoteMove));
    assert_eq!(grid.pointer_down(part, &mut view, &press(410.0, 105.0)), None);
    assert_eq!(grid.active_operation(), Some(OperationKind::NoteMove));

    for _ in 0..3 {
        grid.pointer_move(part, &mut view, &press(230.0, 105.0));
    }
    grid.pointer_up(part, &mut view, &press(230.0, 105.0));

    let moved = &part.notes()[0];
    assert_eq!((moved.pos, moved.pitch), (720.0, 61));
    assert_eq!(part.notes()[1].pos, 1440.0);
    assert_eq!(part.commit_count(), 1);
    assert!(!grid.is_operating());
}

#[test]
fn escape_during_drag_restores_everything() {
    let (mut grid, mut view, mut provider) = setup(&[(480.0, 480.0, 60)]);
    let part = provider.get_mut().unwrap();
    grid.pointer_down(part, &mut view, &press(170.0, 115.0));
    grid.pointer_move(part, &mut view, &press(290.0, 85.0));
    assert_ne!(part.notes()[0].pos, 480.0);

    assert!(grid.execute(EditCommand::Cancel, Some(&mut *part), &mut view));
    assert_eq!((part.notes()[0].pos, part.notes()[0].pitch), (480.0, 60));
    assert_eq!(part.commit_count(), 0);

    grid.pointer_up(part, &mut view, &press(290.0, 85.0));
    assert_eq!(part.commit_count(), 0);
}

#[test]
fn switching_tools_repaints_everything() {
    let (mut grid, mut view, mut provider) = setup(&[]);
    assert!(grid.execute(EditCommand::SelectTool(PianoTool::Lock), provider.get_mut(), &mut view));
    assert_eq!(grid.poll(&mut view, provider.get_mut()), Invalidation::ALL);
    assert!(!grid.execute(EditCommand::SelectTool(PianoTool::Lock), provider.get_mut(), &mut view));
}
