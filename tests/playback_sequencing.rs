mod common;

use std::time::{Duration, Instant};

use common::{SETTLE, build, entered, selected_count};
use tilawa::audio::AudioEvent;
use tilawa::gesture::{SWIPE_DOWN, SWIPE_LEFT, SWIPE_NONE, SWIPE_RIGHT};
use tilawa::models::{PlaybackStatus, VerseKey};
use tilawa::panel::{PanelState, PanelTransition};

fn plays(h: &common::Harness) -> Vec<String> {
    h.audio.borrow().plays.clone()
}

#[test]
fn test_loaded_page_is_normalized_with_one_selection() {
    let h = entered(5);
    let page = h.screen.page().unwrap();
    let keys: Vec<VerseKey> = page.verses().iter().map(|v| v.key).collect();
    assert_eq!(
        keys,
        vec![VerseKey::new(5, 1), VerseKey::new(5, 2), VerseKey::new(5, 3)]
    );
    assert_eq!(page.verses()[0].text, "first");
    assert_eq!(selected_count(&h.screen), 1);
    assert!(page.verses()[0].selected);
    assert_eq!(h.screen.registry().len(), 2);
}

#[test]
fn test_selection_stays_single() {
    let mut h = entered(5);
    h.screen.select_verse(VerseKey::new(5, 3));
    assert_eq!(selected_count(&h.screen), 1);
    h.screen.step_verse(false);
    assert_eq!(selected_count(&h.screen), 1);
    assert_eq!(
        h.screen.page().and_then(|p| p.selected()).map(|v| v.key),
        Some(VerseKey::new(5, 2))
    );
}

#[test]
fn test_completion_walks_the_page_then_turns_it_once() {
    let mut h = entered(5);
    assert!(h.screen.toggle_playback());

    for _ in 0..3 {
        h.audio.borrow().finish_current();
        h.screen.pump();
    }
    assert!(h.screen.settle(SETTLE));

    assert_eq!(h.provider.requests(), vec![5, 6]);
    assert_eq!(
        plays(&h),
        vec![
            "https://default.example/005001.mp3",
            "https://default.example/005002.mp3",
            "https://default.example/005003.mp3",
            "https://default.example/006001.mp3",
        ]
    );
    assert_eq!(h.audio.borrow().created, 1);
    assert_eq!(h.screen.page_number(), 6);
    assert_eq!(h.screen.status(), &PlaybackStatus::Playing);
}

#[test]
fn test_stale_completion_after_page_turn_is_ignored() {
    let mut h = entered(5);
    h.screen.toggle_playback();
    h.screen.select_verse(VerseKey::new(5, 3));
    h.audio.borrow().finish_current();
    h.screen.pump();
    h.screen.settle(SETTLE);

    h.audio.borrow().send(AudioEvent::Ended {
        source: "https://default.example/005003.mp3".to_string(),
    });
    h.screen.pump();
    assert_eq!(h.provider.requests(), vec![5, 6]);
    assert_eq!(plays(&h).len(), 3);
}

#[test]
fn test_end_of_last_page_finishes() {
    let mut h = entered(604);
    h.screen.toggle_playback();
    for _ in 0..3 {
        h.audio.borrow().finish_current();
        h.screen.pump();
    }
    h.screen.settle(SETTLE);
    assert_eq!(h.provider.requests(), vec![604]);
    assert_eq!(h.screen.status(), &PlaybackStatus::Finished);
    assert!(!h.screen.controller().is_playing());
}

#[test]
fn test_double_tap_window() {
    let mut h = entered(1);
    assert_eq!(h.screen.panel(), PanelState::Active);

    let start = Instant::now();
    assert_eq!(h.screen.on_tap(start), None);
    assert_eq!(
        h.screen.on_tap(start + Duration::from_millis(799)),
        Some(PanelTransition::Hide)
    );
    assert_eq!(h.screen.panel(), PanelState::Inactive);

    let later = start + Duration::from_secs(5);
    assert_eq!(h.screen.on_tap(later), None);
    assert_eq!(h.screen.on_tap(later + Duration::from_millis(900)), None);
    assert_eq!(h.screen.panel(), PanelState::Inactive);
}

#[test]
fn test_swipe_codes() {
    let mut h = entered(10);
    assert!(h.screen.on_swipe(SWIPE_NONE));
    h.screen.settle(SETTLE);
    assert!(h.screen.on_swipe(SWIPE_RIGHT));
    h.screen.settle(SETTLE);
    assert!(h.screen.on_swipe(SWIPE_LEFT));
    h.screen.settle(SETTLE);
    assert!(!h.screen.on_swipe(3));
    assert!(!h.screen.on_swipe(SWIPE_DOWN));
    h.screen.settle(SETTLE);

    assert_eq!(h.provider.requests(), vec![10, 11, 12, 11]);
    assert_eq!(h.screen.page_number(), 11);
}

#[test]
fn test_selecting_same_verse_is_idempotent() {
    let mut h = entered(5);
    h.screen.toggle_playback();
    assert_eq!(plays(&h).len(), 1);

    assert!(!h.screen.select_verse(VerseKey::new(5, 1)));
    assert_eq!(plays(&h).len(), 1);

    assert!(h.screen.select_verse(VerseKey::new(5, 2)));
    assert!(!h.screen.select_verse(VerseKey::new(5, 2)));
    assert_eq!(
        plays(&h).last().map(String::as_str),
        Some("https://default.example/005002.mp3")
    );
    assert_eq!(plays(&h).len(), 2);
}

#[test]
fn test_selecting_verse_shows_panel() {
    let mut h = entered(5);
    let start = Instant::now();
    h.screen.on_tap(start);
    h.screen.on_tap(start + Duration::from_millis(10));
    assert_eq!(h.screen.panel(), PanelState::Inactive);
    h.screen.select_verse(VerseKey::new(5, 2));
    assert_eq!(h.screen.panel(), PanelState::Active);
}

#[test]
fn test_reciter_switch_repoints_without_second_resource() {
    let mut h = entered(5);
    h.screen.toggle_playback();
    h.screen.select_verse(VerseKey::new(5, 2));
    assert!(h.screen.select_reciter("Other Reciter"));

    assert_eq!(
        plays(&h).last().map(String::as_str),
        Some("https://other.example/005002.mp3")
    );
    assert_eq!(h.audio.borrow().created, 1);
    assert!(!h.screen.select_reciter("Nobody"));
}

#[test]
fn test_backward_page_change_pauses() {
    let mut h = entered(5);
    h.screen.toggle_playback();
    assert!(h.screen.change_page(-1));
    assert_eq!(h.audio.borrow().pauses, 1);
    assert!(!h.screen.controller().is_playing());

    h.screen.settle(SETTLE);
    assert_eq!(h.screen.page_number(), 4);
    assert_eq!(plays(&h).len(), 1);
    assert_eq!(h.screen.controller().current_verse(), Some(VerseKey::new(4, 1)));
}

#[test]
fn test_forward_page_change_autoplays_only_while_playing() {
    let mut idle = entered(5);
    idle.screen.change_page(1);
    idle.screen.settle(SETTLE);
    assert_eq!(idle.screen.page_number(), 6);
    assert!(plays(&idle).is_empty());

    let mut playing = entered(5);
    playing.screen.toggle_playback();
    playing.screen.change_page(1);
    playing.screen.settle(SETTLE);
    assert_eq!(
        plays(&playing).last().map(String::as_str),
        Some("https://default.example/006001.mp3")
    );
}

#[test]
fn test_failed_page_fetch_keeps_prior_page() {
    let provider = common::MemoryProvider::new();
    provider.fail_page(6);
    let mut h = build(5, provider);
    h.screen.enter(&h.bus);
    h.screen.settle(SETTLE);

    assert!(h.screen.change_page(1));
    h.screen.settle(SETTLE);
    assert_eq!(h.screen.page_number(), 5);
    assert_eq!(h.screen.page().map(|p| p.number()), Some(5));
    assert!(h.screen.last_error().is_some_and(|e| e.contains("page 6")));
    assert_eq!(selected_count(&h.screen), 1);
}

#[test]
fn test_play_before_reciters_arrive_is_deferred() {
    let mut h = build(5, common::MemoryProvider::new());
    h.screen.enter(&h.bus);
    assert!(!h.screen.toggle_playback());
    assert_eq!(h.screen.status(), &PlaybackStatus::Deferred);

    h.screen.settle(SETTLE);
    assert_eq!(h.screen.status(), &PlaybackStatus::Playing);
    assert_eq!(plays(&h), vec!["https://default.example/005001.mp3"]);
}

#[test]
fn test_reciter_list_failure_keeps_deferred() {
    let provider = common::MemoryProvider::new();
    provider.fail_reciters();
    let mut h = build(5, provider);
    h.screen.enter(&h.bus);
    h.screen.toggle_playback();
    h.screen.settle(SETTLE);
    assert_eq!(h.screen.status(), &PlaybackStatus::Deferred);
    assert!(h.screen.last_error().is_some());
    assert_eq!(h.audio.borrow().created, 0);
}

#[test]
fn test_results_after_leave_are_ignored() {
    let mut h = build(5, common::MemoryProvider::new());
    h.screen.enter(&h.bus);
    h.screen.leave();
    assert!(!h.screen.is_alive());
    h.screen.settle(SETTLE);
    assert!(h.screen.page().is_none());
    assert!(h.screen.registry().is_empty());
    assert_eq!(h.bus.subscriber_count(), 0);
}

#[test]
fn test_leave_releases_audio_and_ignores_late_completion() {
    let mut h = entered(5);
    h.screen.toggle_playback();
    h.screen.leave();
    assert_eq!(h.audio.borrow().released, 1);
    assert_eq!(h.screen.status(), &PlaybackStatus::Released);

    h.audio.borrow().finish_current();
    h.screen.pump();
    assert_eq!(plays(&h).len(), 1);
    assert_eq!(h.provider.requests(), vec![5]);
}

#[test]
fn test_seek_uses_configured_step() {
    let mut h = entered(5);
    h.screen.seek(1);
    assert!(h.audio.borrow().seeks.is_empty());
    h.screen.toggle_playback();
    h.screen.seek(-1);
    h.screen.seek(1);
    assert_eq!(h.audio.borrow().seeks, vec![-10.0, 10.0]);
}

#[test]
fn test_resume_after_back_swipe_plays_new_page_from_its_first_verse() {
    let mut h = entered(5);
    h.screen.toggle_playback();
    assert!(h.screen.change_page(-1));
    h.screen.settle(SETTLE);

    assert!(h.screen.toggle_playback());
    assert_eq!(
        plays(&h).last().map(String::as_str),
        Some("https://default.example/004001.mp3")
    );

    h.audio.borrow().finish_current();
    h.screen.pump();
    assert_eq!(
        plays(&h),
        vec![
            "https://default.example/005001.mp3",
            "https://default.example/004001.mp3",
            "https://default.example/004002.mp3",
        ]
    );
    assert_eq!(
        h.screen.page().and_then(|p| p.selected()).map(|v| v.key),
        Some(VerseKey::new(4, 2))
    );
}

#[test]
fn test_toggle_after_failed_clip_plays_it_again() {
    let mut h = entered(5);
    h.screen.toggle_playback();
    h.audio.borrow().send(AudioEvent::Failed {
        source: "https://default.example/005001.mp3".to_string(),
        reason: "player exited with exit status: 1".to_string(),
    });
    h.screen.pump();
    assert!(matches!(h.screen.status(), PlaybackStatus::Failed(_)));

    assert!(h.screen.toggle_playback());
    assert_eq!(h.screen.status(), &PlaybackStatus::Playing);
    assert_eq!(
        plays(&h),
        vec![
            "https://default.example/005001.mp3",
            "https://default.example/005001.mp3",
        ]
    );
}

#[test]
fn test_toggle_after_finishing_last_page_replays_last_verse() {
    let mut h = entered(604);
    h.screen.toggle_playback();
    for _ in 0..3 {
        h.audio.borrow().finish_current();
        h.screen.pump();
    }
    h.screen.settle(SETTLE);
    assert_eq!(h.screen.status(), &PlaybackStatus::Finished);

    assert!(h.screen.toggle_playback());
    assert_eq!(h.screen.status(), &PlaybackStatus::Playing);
    assert_eq!(plays(&h).len(), 4);
    assert_eq!(
        plays(&h).last().map(String::as_str),
        Some("https://default.example/604003.mp3")
    );
}

#[test]
fn test_forward_swipe_pauses_old_clip_until_next_page_plays() {
    let mut h = entered(5);
    h.screen.toggle_playback();
    assert!(h.screen.on_swipe(SWIPE_RIGHT));
    assert_eq!(h.audio.borrow().pauses, 1);

    h.audio.borrow().send(AudioEvent::Ended {
        source: "https://default.example/005001.mp3".to_string(),
    });
    h.screen.settle(SETTLE);

    assert!(!plays(&h).iter().any(|url| url.ends_with("005002.mp3")));
    assert_eq!(
        plays(&h).last().map(String::as_str),
        Some("https://default.example/006001.mp3")
    );
    assert_eq!(h.screen.status(), &PlaybackStatus::Playing);
}

#[test]
fn test_quick_forward_swipes_keep_autoplay() {
    let mut h = entered(5);
    h.screen.toggle_playback();
    h.screen.change_page(1);
    h.screen.change_page(1);
    h.screen.settle(SETTLE);

    assert_eq!(h.screen.page_number(), 7);
    assert_eq!(
        plays(&h).last().map(String::as_str),
        Some("https://default.example/007001.mp3")
    );
}
