//! Trace pass-through 单元测试

use crate::trace::{
    CategoryGroupFlag, LogTracingController, TraceArg, TraceEvent, TracePhase, TraceValue,
    TracingController, ENABLED_FOR_RECORDING, PLACEHOLDER_CATEGORY_NAME,
};

#[cfg(test)]
mod flag_tests {
    use super::*;

    #[test]
    fn test_disabled_flag_is_shared_and_off() {
        let a = CategoryGroupFlag::disabled();
        let b = CategoryGroupFlag::disabled();
        assert!(a.same_flag(&b));
        assert!(!a.is_enabled());
        assert_eq!(a.bits(), 0);
    }

    #[test]
    fn test_flag_bits() {
        let flag = CategoryGroupFlag::new(0);
        let alias = flag.clone();
        flag.set_bits(ENABLED_FOR_RECORDING);
        assert!(alias.is_enabled());
        assert!(!flag.same_flag(&CategoryGroupFlag::new(0)));
    }

    #[test]
    fn test_phase_codes() {
        assert_eq!(TracePhase::Begin.as_char(), 'B');
        assert_eq!(TracePhase::Complete.as_char(), 'X');
        assert_eq!(TracePhase::AsyncEnd.as_char(), 'e');
    }

    #[test]
    fn test_trace_value_display() {
        assert_eq!(TraceValue::Uint(7).to_string(), "7");
        assert_eq!(TraceValue::String("gc".into()).to_string(), "\"gc\"");
    }
}

#[cfg(test)]
mod log_controller_tests {
    use super::*;

    #[test]
    fn test_enabled_categories() {
        let mut controller = LogTracingController::new(["yx"]);
        assert!(controller.get_category_group_enabled("yx").is_enabled());
        assert!(controller.get_category_group_enabled("gc,yx").is_enabled());
        assert!(!controller.get_category_group_enabled("gc").is_enabled());
    }

    #[test]
    fn test_same_group_returns_same_flag() {
        let mut controller = LogTracingController::new(["yx"]);
        let a = controller.get_category_group_enabled("yx");
        let b = controller.get_category_group_enabled("yx");
        assert!(a.same_flag(&b));
        assert_eq!(controller.get_category_group_name(&a), "yx");
    }

    #[test]
    fn test_unknown_flag_name_is_placeholder() {
        let controller = LogTracingController::new(Vec::<String>::new());
        let name = controller.get_category_group_name(&CategoryGroupFlag::new(1));
        assert_eq!(name, PLACEHOLDER_CATEGORY_NAME);
    }

    #[test]
    fn test_add_event_assigns_handles() {
        let mut controller = LogTracingController::new(["yx"]);
        let flag = controller.get_category_group_enabled("yx");
        let args = [TraceArg::new("bytes", TraceValue::Uint(128))];

        let first = controller.add_trace_event(
            &TraceEvent::new(TracePhase::Begin, &flag, "compile").with_args(&args),
        );
        let second = controller.add_trace_event(&TraceEvent::new(TracePhase::Instant, &flag, "tick"));
        assert_ne!(first, 0);
        assert_eq!(second, first + 1);
        assert_eq!(controller.open_events(), 1);

        controller.update_trace_event_duration(&flag, "compile", first);
        assert_eq!(controller.open_events(), 0);
    }

    #[test]
    fn test_disabled_category_yields_no_event() {
        let mut controller = LogTracingController::new(["yx"]);
        let flag = controller.get_category_group_enabled("gc");
        assert_eq!(
            controller.add_trace_event(&TraceEvent::new(TracePhase::Begin, &flag, "mark")),
            0
        );
    }

    #[test]
    fn test_stop_and_restart() {
        let mut controller = LogTracingController::new(["yx"]);
        let flag = controller.get_category_group_enabled("yx");
        controller.add_trace_event(&TraceEvent::new(TracePhase::Begin, &flag, "compile"));

        controller.stop_tracing();
        assert!(!controller.is_recording());
        assert!(!flag.is_enabled());
        assert_eq!(controller.open_events(), 0);
        assert_eq!(
            controller.add_trace_event(&TraceEvent::new(TracePhase::Begin, &flag, "compile")),
            0
        );

        controller.start_tracing();
        assert!(flag.is_enabled());
    }
}
