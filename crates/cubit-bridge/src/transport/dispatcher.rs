//! Python code run inside the toolkit interpreter.
//!
//! The interpreter is started with [`BOOTSTRAP`] as its `-c` program. The
//! bootstrap reads one frame from stdin, the [`DISPATCHER_SOURCE`], and
//! executes it. Both are written for Python 2.7 and Python 3 alike, since the
//! interpreter bundled with older toolkit releases is Python 2.

/// Loader passed on the command line.
pub const BOOTSTRAP: &str = r#"import struct, sys
_channel_in = getattr(sys.stdin, "buffer", sys.stdin)
def _read_exact(size):
    data = b""
    while len(data) < size:
        chunk = _channel_in.read(size - len(data))
        if not chunk:
            sys.exit(0)
        data += chunk
    return data
_size = struct.unpack(">I", _read_exact(4))[0]
_namespace = {"__name__": "__cubit_bridge__", "_read_exact": _read_exact}
exec(compile(_read_exact(_size).decode("utf-8"), "<cubit-bridge>", "exec"), _namespace)
"#;

/// Message loop answering the bridge protocol.
pub const DISPATCHER_SOURCE: &str = r#"import json
import os
import struct
import sys
import traceback

HANDLE_PREFIX = "cp2t3id_"
FLOAT_TAG = "float"

CATEGORIES = {
    "cubitpy_vertex": "Vertex",
    "cubitpy_curve": "Curve",
    "cubitpy_surface": "Surface",
    "cubitpy_volume": "Volume",
}

try:
    _TEXT = (str, unicode)
    _INTEGERS = (int, long)
    _PY2 = True
except NameError:
    _TEXT = (str,)
    _INTEGERS = (int,)
    _PY2 = False

# Frames own the real stdout. Whatever the toolkit prints lands on stderr.
_channel_out = os.fdopen(os.dup(1), "wb")
os.dup2(2, 1)

_objects = {}
_parameters = {}
_state = {"cubit": None}


_NON_FINITE = {"nan": float("nan"), "inf": float("inf"), "-inf": float("-inf")}


def _send(payload):
    _channel_out.write(struct.pack(">I", len(payload)))
    _channel_out.write(payload)
    _channel_out.flush()


def _receive():
    size = struct.unpack(">I", _read_exact(4))[0]
    return json.loads(_read_exact(size).decode("utf-8"))


def _encode(value):
    return json.dumps(value, allow_nan=False).encode("utf-8")


def _text(value):
    try:
        text = str(value)
    except Exception:
        text = repr(value)
    if _PY2 and not isinstance(text, unicode):
        text = text.decode("utf-8", "replace")
    return text


def _native(value):
    if _PY2 and isinstance(value, unicode):
        return value.encode("utf-8")
    return value


def _is_handle(value):
    return (
        isinstance(value, list)
        and len(value) > 0
        and isinstance(value[0], _TEXT)
        and value[0].startswith(HANDLE_PREFIX)
    )


def _handle_id(value):
    return int(value[0][len(HANDLE_PREFIX):])


def _from_wire(value):
    if _is_handle(value):
        return _objects[_handle_id(value)]
    if isinstance(value, list):
        return [_from_wire(item) for item in value]
    if isinstance(value, dict) and list(value.keys()) == [FLOAT_TAG]:
        return _NON_FINITE[value[FLOAT_TAG]]
    return _native(value)


def _to_wire(value):
    if isinstance(value, float):
        if value != value:
            return {FLOAT_TAG: "nan"}
        if value in (_NON_FINITE["inf"], _NON_FINITE["-inf"]):
            return {FLOAT_TAG: "inf" if value > 0 else "-inf"}
        return value
    if value is None or isinstance(value, (bool,) + _TEXT + _INTEGERS):
        return value
    if isinstance(value, (list, tuple)):
        return [_to_wire(item) for item in value]
    key = id(value)
    _objects[key] = value
    return [HANDLE_PREFIX + str(key), _text(value)]


def _init(launch_args):
    bin_path = _parameters.get("cubit_bin_path")
    if bin_path:
        bin_path = _native(bin_path)
        if bin_path not in sys.path:
            sys.path.append(bin_path)
    import cubit

    cubit.init([_native(arg) for arg in launch_args])
    _state["cubit"] = cubit
    return _to_wire(cubit)


def _isinstance(obj, category):
    cls = getattr(_state["cubit"], CATEGORIES.get(category, category), None)
    if cls is None:
        return False
    try:
        return isinstance(obj, cls)
    except TypeError:
        return False


def _self_dir(obj):
    return [
        [name, callable(getattr(obj, name, None))]
        for name in dir(obj)
        if not name.startswith("__")
    ]


def _dispatch(message):
    head = message[0]
    if isinstance(head, dict):
        _parameters.update(head)
        return True
    if _is_handle(head):
        target = getattr(_from_wire(head), _native(message[1]))
        if callable(target):
            return _to_wire(target(*_from_wire(message[2])))
        return _to_wire(target)
    if head == "init":
        return _init(message[1])
    if head == "iscallable":
        return callable(getattr(_from_wire(message[1]), _native(message[2])))
    if head == "isinstance":
        return _isinstance(_from_wire(message[1]), message[2])
    if head == "get_self_dir":
        return _self_dir(_from_wire(message[1]))
    if head == "delete":
        _objects.pop(_handle_id(message[1]), None)
        return None
    raise ValueError("Unknown message: %r" % (head,))


def _reply(message):
    # Encoding happens inside the try so that an unencodable result still
    # produces an answer and the loop survives.
    try:
        return _encode({"ok": _dispatch(message)})
    except Exception as error:
        return _encode(
            {
                "error": {
                    "type": type(error).__name__,
                    "message": _text(error),
                    "traceback": _text(traceback.format_exc()),
                }
            }
        )


while True:
    _send(_reply(_receive()))
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WireConfig;

    #[test]
    fn test_dispatcher_uses_shared_handle_prefix() {
        let line = format!("HANDLE_PREFIX = \"{}\"", WireConfig::HANDLE_PREFIX);
        assert!(DISPATCHER_SOURCE.contains(&line));
    }

    #[test]
    fn test_dispatcher_answers_every_verb() {
        for verb in ["\"init\"", "\"iscallable\"", "\"isinstance\"", "\"get_self_dir\"", "\"delete\""] {
            assert!(DISPATCHER_SOURCE.contains(verb), "missing {verb}");
        }
    }

    #[test]
    fn test_dispatcher_uses_shared_float_tag() {
        let line = format!("FLOAT_TAG = \"{}\"", WireConfig::FLOAT_TAG);
        assert!(DISPATCHER_SOURCE.contains(&line));
        assert!(DISPATCHER_SOURCE.contains("allow_nan=False"));
    }

    #[test]
    fn test_dispatcher_knows_geometry_categories() {
        for geometry in crate::GeometryType::ALL {
            assert!(DISPATCHER_SOURCE.contains(geometry.isinstance_name()));
        }
    }
}
