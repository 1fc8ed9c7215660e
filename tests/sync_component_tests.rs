//! Edge-triggered parts wired into full circuits.

mod common;

use common::*;
use rusty_logic::components::clock::ManualTimeSource;
use rusty_logic::components::{
    Alu, Clock, Counter, Decoder, Edge, EdgeTrigger, FlipFlop, FlipFlopKind, Mux, RandomBit, Ram, ShiftRegister,
};
use rusty_logic::{Circuit, ComponentId, InputEvent, LogicValue, SimConfig};
use LogicValue::*;

fn bus_word(c: &Circuit, component: ComponentId, prefix: &str, width: usize) -> Option<u64> {
    let bits: Vec<LogicValue> = (0..width)
        .map(|i| pin_value(c, component, &format!("{}{}", prefix, i)))
        .collect();
    LogicValue::word_from_bits(&bits)
}

fn drive_bus(c: &mut Circuit, bus: &[(ComponentId, rusty_logic::NodeId)], target: ComponentId, prefix: &str) {
    for (i, (_, out)) in bus.iter().enumerate() {
        drive(c, *out, target, &format!("{}{}", prefix, i));
    }
}

#[cfg(test)]
mod flipflop_tests {
    use super::*;

    #[test]
    fn test_d_flipflop_captures_on_rising_edge() {
        let mut c = circuit();
        let (d_sw, d) = switch(&mut c, true);
        let (clk_sw, clk) = switch(&mut c, false);
        let ff = c.add_component(FlipFlop::new(FlipFlopKind::D, EdgeTrigger::new(Edge::Rising)));
        drive(&mut c, d, ff, "D");
        drive(&mut c, clk, ff, "CLK");
        c.step();
        assert_eq!((pin_value(&c, ff, "Q"), pin_value(&c, ff, "NQ")), (False, True));

        c.enqueue(InputEvent::ToggleInput { component: clk_sw });
        c.step();
        assert_eq!((pin_value(&c, ff, "Q"), pin_value(&c, ff, "NQ")), (True, False));

        // D changes without an edge: Q holds.
        c.enqueue(InputEvent::ToggleInput { component: d_sw });
        c.step();
        assert_eq!(pin_value(&c, ff, "Q"), True);
        c.enqueue(InputEvent::ToggleInput { component: clk_sw });
        c.step();
        assert_eq!(pin_value(&c, ff, "Q"), True);

        c.enqueue(InputEvent::ToggleInput { component: clk_sw });
        c.step();
        assert_eq!((pin_value(&c, ff, "Q"), pin_value(&c, ff, "NQ")), (False, True));
    }

    #[test]
    fn test_preset_and_clear_together_are_unknown() {
        let mut c = circuit();
        let ff = c.add_component(FlipFlop::new(FlipFlopKind::T, EdgeTrigger::new(Edge::Rising)));
        let (_, pre) = switch(&mut c, true);
        let (clr_sw, clr) = switch(&mut c, true);
        drive(&mut c, pre, ff, "PRE");
        drive(&mut c, clr, ff, "CLR");
        c.step();
        assert_eq!((pin_value(&c, ff, "Q"), pin_value(&c, ff, "NQ")), (Unknown, Unknown));

        c.enqueue(InputEvent::ToggleInput { component: clr_sw });
        c.step();
        assert_eq!((pin_value(&c, ff, "Q"), pin_value(&c, ff, "NQ")), (True, False));
    }

    #[test]
    fn test_toggle_flipflop_divides_clock() {
        let mut c = circuit();
        let (_, t) = switch(&mut c, true);
        let (clk_sw, clk) = switch(&mut c, false);
        let ff = c.add_component(FlipFlop::new(FlipFlopKind::T, EdgeTrigger::new(Edge::Rising)));
        drive(&mut c, t, ff, "T");
        drive(&mut c, clk, ff, "CLK");
        c.step();

        let mut seen = Vec::new();
        for _ in 0..4 {
            pulse(&mut c, clk_sw);
            seen.push(pin_value(&c, ff, "Q"));
        }
        assert_eq!(seen, vec![True, False, True, False]);
    }
}

#[cfg(test)]
mod counter_tests {
    use super::*;

    fn counter_circuit() -> (Circuit, ComponentId, ComponentId, ComponentId) {
        let mut c = circuit();
        let (clk_sw, clk) = switch(&mut c, false);
        let (clr_sw, clr) = switch(&mut c, false);
        let counter = c.add_component(Counter::new(4, EdgeTrigger::new(Edge::Rising)));
        drive(&mut c, clk, counter, "CLK");
        drive(&mut c, clr, counter, "CLR");
        c.step();
        (c, counter, clk_sw, clr_sw)
    }

    #[test]
    fn test_overflow_asserted_for_one_cycle() {
        let (mut c, counter, clk_sw, _) = counter_circuit();
        c.component_as_mut::<Counter>(counter).unwrap().set_count(15);
        c.step();
        assert_eq!(bus_word(&c, counter, "Q", 4), Some(15));
        assert_eq!(pin_value(&c, counter, "OVF"), False);

        pulse(&mut c, clk_sw);
        assert_eq!(bus_word(&c, counter, "Q", 4), Some(0));
        assert_eq!(pin_value(&c, counter, "OVF"), True);

        pulse(&mut c, clk_sw);
        assert_eq!(bus_word(&c, counter, "Q", 4), Some(1));
        assert_eq!(pin_value(&c, counter, "OVF"), False);
    }

    #[test]
    fn test_clear_resets_count() {
        let (mut c, counter, clk_sw, clr_sw) = counter_circuit();
        for _ in 0..5 {
            pulse(&mut c, clk_sw);
        }
        assert_eq!(bus_word(&c, counter, "Q", 4), Some(5));

        c.enqueue(InputEvent::ToggleInput { component: clr_sw });
        c.step();
        assert_eq!(bus_word(&c, counter, "Q", 4), Some(0));
        // Held clear blocks counting.
        pulse(&mut c, clk_sw);
        assert_eq!(c.component_as::<Counter>(counter).unwrap().count(), 0);
    }

    #[test]
    fn test_clock_component_drives_counter() {
        let mut c = circuit();
        let time = ManualTimeSource::new();
        c.set_time_source(Box::new(time.clone()));
        let clock = c.add_component(Clock::new(10, 50));
        let counter = c.add_component(Counter::new(4, EdgeTrigger::new(Edge::Rising)));
        let clk = c.output_node(clock, 0).unwrap();
        drive(&mut c, clk, counter, "CLK");

        c.step();
        for _ in 0..6 {
            time.advance(5);
            c.step();
        }
        // Six half periods: three rising edges.
        assert_eq!(bus_word(&c, counter, "Q", 4), Some(3));
    }
}

#[cfg(test)]
mod memory_tests {
    use super::*;

    #[test]
    fn test_ram_write_then_read_back() {
        let mut c = circuit();
        let ram = c.add_component(Ram::new(4, 4, EdgeTrigger::new(Edge::Rising)));
        let address = switch_bus(&mut c, 3, 4);
        let data = switch_bus(&mut c, 0b1010, 4);
        let (we_sw, we) = switch(&mut c, true);
        let (clk_sw, clk) = switch(&mut c, false);
        drive_bus(&mut c, &address, ram, "A");
        drive_bus(&mut c, &data, ram, "D");
        drive(&mut c, we, ram, "WE");
        drive(&mut c, clk, ram, "CLK");
        c.step();
        assert_eq!(bus_word(&c, ram, "Q", 4), Some(0));

        pulse(&mut c, clk_sw);
        assert_eq!(bus_word(&c, ram, "Q", 4), Some(0b1010));

        // Write disabled: new data on the bus is ignored.
        c.enqueue(InputEvent::ToggleInput { component: we_sw });
        set_bus(&mut c, &data, 0b0101);
        c.step();
        pulse(&mut c, clk_sw);
        assert_eq!(bus_word(&c, ram, "Q", 4), Some(0b1010));

        set_bus(&mut c, &address, 2);
        c.step();
        assert_eq!(bus_word(&c, ram, "Q", 4), Some(0));
        set_bus(&mut c, &address, 3);
        c.step();
        assert_eq!(bus_word(&c, ram, "Q", 4), Some(0b1010));

        let memory = c.component_as::<Ram>(ram).unwrap().memory().to_vec();
        let written: Vec<usize> = memory.iter().enumerate().filter(|(_, w)| **w != 0).map(|(a, _)| a).collect();
        assert_eq!(written, vec![3]);
    }

    #[test]
    fn test_unknown_address_reads_unknown() {
        let mut c = circuit();
        let ram = c.add_component(Ram::new(2, 2, EdgeTrigger::new(Edge::Rising)));
        let a0 = c.pin(ram, "A0").unwrap();
        c.enqueue(InputEvent::ForceNode {
            node: a0,
            value: Some(Unknown),
        });
        c.step();
        assert_eq!(c.output_values(ram).unwrap(), vec![Unknown, Unknown]);
    }
}

#[cfg(test)]
mod datapath_tests {
    use super::*;

    #[test]
    fn test_shift_register_fed_by_switch() {
        let mut c = circuit();
        let sr = c.add_component(ShiftRegister::new(4, EdgeTrigger::new(Edge::Rising)));
        let (sin_sw, sin) = switch(&mut c, true);
        let (clk_sw, clk) = switch(&mut c, false);
        drive(&mut c, sin, sr, "SIN");
        drive(&mut c, clk, sr, "CLK");
        c.step();

        pulse(&mut c, clk_sw);
        c.enqueue(InputEvent::ToggleInput { component: sin_sw });
        c.step();
        pulse(&mut c, clk_sw);
        pulse(&mut c, clk_sw);
        assert_eq!(bus_word(&c, sr, "Q", 4), Some(0b0100));
    }

    #[test]
    fn test_alu_adds_switch_words() {
        let mut c = circuit();
        let alu = c.add_component(Alu::new(4));
        let a = switch_bus(&mut c, 9, 4);
        let b = switch_bus(&mut c, 8, 4);
        drive_bus(&mut c, &a, alu, "A");
        drive_bus(&mut c, &b, alu, "B");
        c.step();
        assert_eq!(bus_word(&c, alu, "S", 4), Some(1));
        assert_eq!(pin_value(&c, alu, "V"), True);
        assert_eq!(pin_value(&c, alu, "Z"), False);

        set_bus(&mut c, &b, 7);
        c.step();
        assert_eq!(bus_word(&c, alu, "S", 4), Some(0));
        assert_eq!(pin_value(&c, alu, "V"), True);
        assert_eq!(pin_value(&c, alu, "Z"), True);
    }

    #[test]
    fn test_decoder_selects_mux_input() {
        let mut c = circuit();
        let decoder = c.add_component(Decoder::new(2));
        let mux = c.add_component(Mux::new(2, 1));
        let select = switch_bus(&mut c, 2, 2);
        drive_bus(&mut c, &select, decoder, "A");
        drive_bus(&mut c, &select, mux, "S");
        for group in 0..4 {
            let y = c.pin(decoder, &format!("Y{}", group)).unwrap();
            drive(&mut c, y, mux, &format!("I{}_0", group));
        }
        c.step();
        assert_eq!(bus_word(&c, decoder, "Y", 4), Some(0b0100));
        assert_eq!(pin_value(&c, mux, "Y0"), True);
    }

    #[test]
    fn test_seeded_random_sources_agree() {
        let run = |seed: u64| {
            let mut c = Circuit::new(SimConfig::default().with_seed(seed));
            let source = c.add_component(RandomBit::new(0.5, EdgeTrigger::new(Edge::Rising)));
            let (clk_sw, clk) = switch(&mut c, false);
            drive(&mut c, clk, source, "CLK");
            c.step();
            (0..24)
                .map(|_| {
                    pulse(&mut c, clk_sw);
                    pin_value(&c, source, "OUT")
                })
                .collect::<Vec<_>>()
        };
        assert_eq!(run(7), run(7));
    }
}
