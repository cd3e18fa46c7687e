mod common;
use common::run_pipeline;

#[test]
fn minimal() {
    let out = run_pipeline(include_str!("testfiles/minimal.cay"));
    assert_eq!(out, "# Generated by cayenne. Do not edit.\n\nprint(\"Hello, world!\")\n");
}

#[test]
fn header_comes_before_imports() {
    let out = run_pipeline(include_str!("testfiles/shapes.cay"));
    let header = out.find("# Generated by cayenne. Do not edit.");
    let imports = out.find("from ");
    assert_eq!(header, Some(0));
    assert!(imports.is_some());
}

#[test]
fn runtime_imports_are_sorted_and_deduplicated() {
    let out = run_pipeline(include_str!("testfiles/animals.cay"));

    assert_eq!(out.matches("from abc import").count(), 1);
    assert!(out.contains("from abc import ABC, abstractmethod"));
    assert!(out.contains("from typing import final"));

    let abc = out.find("from abc import");
    let typing = out.find("from typing import");
    assert!(abc < typing);
}

#[test]
fn shapes_lowering() {
    let out = run_pipeline(include_str!("testfiles/shapes.cay"));

    assert!(out.contains("class Shape(Protocol):"));
    assert!(out.contains("class Rectangle(Shape):"));
    assert!(out.contains("def __init__(self, width: float, height: float) -> None:"));
    assert!(out.contains("self.width = width"));
    assert!(out.contains("return self.width * self.height"));
    assert!(out.contains("return 2.0 * (self.width + self.height)"));
}

#[test]
fn animals_lowering() {
    let out = run_pipeline(include_str!("testfiles/animals.cay"));

    assert!(out.contains("class Animal(ABC):"));
    assert!(out.contains("@abstractmethod"));
    assert!(out.contains("def speak(self) -> str:"));
    assert!(out.contains("@final"));
    assert!(out.contains("super().__init__(name)"));
    assert!(out.contains("for animal in animals:"));
    assert!(out.contains("f\"{self.name} says {self.speak()}\""));
}

#[test]
fn stack_lowering() {
    let out = run_pipeline(include_str!("testfiles/stack.cay"));

    assert!(out.contains("T = TypeVar('T')"));
    assert!(out.contains("class Stack(Generic[T]):"));
    assert!(out.contains("def push(self, item: T):"));
    assert!(out.contains("s: Stack[int] = Stack[int]()"));
}

#[test]
fn records_lowering() {
    let out = run_pipeline(include_str!("testfiles/records.cay"));

    assert!(out.contains("@dataclass"));
    assert!(out.contains("class Point:"));
    let x = out.find("x: int");
    let y = out.find("y: int");
    assert!(x.is_some() && x < y);

    let red = out.find("RED = auto()");
    let green = out.find("GREEN = auto()");
    let blue = out.find("BLUE = auto()");
    assert!(red.is_some() && red < green && green < blue);
}

#[test]
fn generated_python_is_runnable() {
    // A smoke test of the actual runtime semantics: write the output and
    // let python3 execute it
    let out = run_pipeline(include_str!("testfiles/shapes.cay"));

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("shapes.py");
    std::fs::write(&path, &out).unwrap();

    let result = std::process::Command::new("python3").arg(&path).output();
    let Ok(result) = result else {
        // No python3 on this machine, nothing more to verify
        return;
    };
    assert!(
        result.status.success(),
        "python3 failed: {}",
        String::from_utf8_lossy(&result.stderr)
    );
    assert_eq!(String::from_utf8_lossy(&result.stdout).trim(), "12.0");
}

#[test]
fn record_equality_and_enum_order_survive_lowering() {
    let out = run_pipeline(include_str!("testfiles/records.cay"));

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("records.py");
    std::fs::write(&path, &out).unwrap();

    let result = std::process::Command::new("python3").arg(&path).output();
    let Ok(result) = result else {
        // No python3 on this machine, nothing more to verify
        return;
    };
    assert!(
        result.status.success(),
        "python3 failed: {}",
        String::from_utf8_lossy(&result.stderr)
    );
    assert_eq!(
        String::from_utf8_lossy(&result.stdout).trim(),
        "True\nFalse\nRED\nGREEN\nBLUE"
    );
}
